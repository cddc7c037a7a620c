use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::dom::{Dom, MutationKind, MutationRecord, NodeId};
use crate::form_controls::{is_form_control_element, is_select_element, is_text_entry_element};
use crate::host::{
    Callback, Document, ElementKind, EventBridge, MutationWatch, NativeEvent, ObservationHost,
    Registration,
};
use crate::html::parse_html;
use crate::{Error, Result};

type TimerTick = Box<dyn FnMut(&Page)>;

struct ListenerEntry {
    id: u64,
    node: NodeId,
    event: String,
    callback: Callback,
}

struct WatcherEntry {
    id: u64,
    node: NodeId,
    watch: MutationWatch,
    callback: Callback,
}

struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    interval_ms: i64,
    tick: TimerTick,
}

/// Snapshot of one queued interval timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
    pub interval_ms: i64,
}

struct SchedulerState {
    task_queue: Vec<ScheduledTask>,
    now_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    running_timer_id: Option<i64>,
    running_timer_canceled: bool,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            running_timer_id: None,
            running_timer_canceled: false,
        }
    }
}

impl SchedulerState {
    fn allocate_timer_id(&mut self) -> i64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    fn allocate_task_order(&mut self) -> i64 {
        let order = self.next_task_order;
        self.next_task_order += 1;
        order
    }

    fn next_task_index(&self, due_limit: i64) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= due_limit)
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    fn step_limit_error(&self, steps: usize, due_limit: i64) -> Error {
        let next_task_desc = self
            .next_task_index(due_limit)
            .and_then(|idx| self.task_queue.get(idx))
            .map(|task| {
                format!(
                    "id={},due_at={},order={},interval_ms={}",
                    task.id, task.due_at, task.order, task.interval_ms
                )
            })
            .unwrap_or_else(|| "none".into());

        Error::Timer(format!(
            "timer queue exceeded max task steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit}, pending_tasks={}, next_task={next_task_desc}",
            self.timer_step_limit,
            self.now_ms,
            self.task_queue.len(),
        ))
    }
}

struct TraceState {
    enabled: bool,
    events: bool,
    timers: bool,
    mutations: bool,
    logs: VecDeque<String>,
    log_limit: usize,
    to_stderr: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            timers: true,
            mutations: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: true,
        }
    }
}

struct PageState {
    dom: Dom,
    listeners: Vec<ListenerEntry>,
    watchers: Vec<WatcherEntry>,
    next_hook_id: u64,
    scheduler: SchedulerState,
    trace: TraceState,
    // Callbacks currently on the stack; mutation delivery waits until the
    // outermost one returns.
    task_depth: usize,
}

impl PageState {
    fn new(dom: Dom) -> Self {
        Self {
            dom,
            listeners: Vec::new(),
            watchers: Vec::new(),
            next_hook_id: 1,
            scheduler: SchedulerState::default(),
            trace: TraceState::default(),
            task_depth: 0,
        }
    }

    fn allocate_hook_id(&mut self) -> u64 {
        let id = self.next_hook_id;
        self.next_hook_id += 1;
        id
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn tag_of(&self, node: NodeId) -> String {
        self.dom
            .tag_name(node)
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "non-element".into())
    }

    fn has_listener(&self, id: u64) -> bool {
        self.listeners.iter().any(|listener| listener.id == id)
    }

    fn has_watcher(&self, id: u64) -> bool {
        self.watchers.iter().any(|watcher| watcher.id == id)
    }

    fn remove_listener(&mut self, id: u64) -> Option<ListenerEntry> {
        let pos = self.listeners.iter().position(|listener| listener.id == id)?;
        Some(self.listeners.remove(pos))
    }

    fn remove_watcher(&mut self, id: u64) -> Option<WatcherEntry> {
        let pos = self.watchers.iter().position(|watcher| watcher.id == id)?;
        Some(self.watchers.remove(pos))
    }

    fn cancel_timer(&mut self, id: i64) -> Option<ScheduledTask> {
        if self.scheduler.running_timer_id == Some(id) {
            self.scheduler.running_timer_canceled = true;
            self.trace_timer_line(format!("[timer] cancel id={id} running=true"));
            return None;
        }
        let pos = self
            .scheduler
            .task_queue
            .iter()
            .position(|task| task.id == id)?;
        self.trace_timer_line(format!("[timer] cancel id={id} running=false"));
        Some(self.scheduler.task_queue.remove(pos))
    }

    fn listeners_on_path(&self, target: NodeId, event: &str) -> Vec<(u64, Callback)> {
        let mut out = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            out.extend(
                self.listeners
                    .iter()
                    .filter(|listener| listener.node == node && listener.event == event)
                    .map(|listener| (listener.id, listener.callback.clone())),
            );
            cursor = self.dom.parent(node);
        }
        out
    }

    fn watcher_matches(&self, watcher: &WatcherEntry, record: &MutationRecord) -> bool {
        let in_scope = record.target == watcher.node
            || (watcher.watch.subtree && self.dom.is_inclusive_ancestor(watcher.node, record.target));
        if !in_scope {
            return false;
        }
        match &record.kind {
            MutationKind::ChildList => watcher.watch.child_list,
            MutationKind::CharacterData => watcher.watch.character_data,
            MutationKind::Attributes { name } => watcher.watch.accepts_attribute(name),
        }
    }

    fn matching_watchers(&self, records: &[MutationRecord]) -> Vec<(u64, Callback)> {
        self.watchers
            .iter()
            .filter(|watcher| {
                records
                    .iter()
                    .any(|record| self.watcher_matches(watcher, record))
            })
            .map(|watcher| (watcher.id, watcher.callback.clone()))
            .collect()
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.events {
            self.trace_line(line);
        }
    }

    fn trace_timer_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.timers {
            self.trace_line(line);
        }
    }

    fn trace_mutation_line(&mut self, line: String) {
        if self.trace.enabled && self.trace.mutations {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace.enabled {
            if self.trace.to_stderr {
                eprintln!("{line}");
            }
            if self.trace.logs.len() >= self.trace.log_limit {
                self.trace.logs.pop_front();
            }
            self.trace.logs.push_back(line);
        }
    }
}

/// Deterministic single-threaded document.
///
/// `Page` is a cheap handle; clones share one document. Every action that
/// changes the tree ends with a microtask checkpoint that delivers queued
/// mutation records to the registered watchers, and interval timers only run
/// when the virtual clock is advanced.
#[derive(Clone)]
pub struct Page {
    state: Rc<RefCell<PageState>>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Page")
            .field("now_ms", &state.scheduler.now_ms)
            .field("listeners", &state.listeners.len())
            .field("watchers", &state.watchers.len())
            .field("timers", &state.scheduler.task_queue.len())
            .finish()
    }
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            state: Rc::new(RefCell::new(PageState::new(dom))),
        })
    }

    pub fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.state.borrow().select_one(selector)
    }

    pub fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.state.borrow().dom.query_selector_all(selector)?.len())
    }

    pub fn text_of(&self, selector: &str) -> Result<String> {
        let state = self.state.borrow();
        let target = state.select_one(selector)?;
        Ok(state.dom.text_content(target))
    }

    pub fn value_of(&self, selector: &str) -> Result<String> {
        let state = self.state.borrow();
        let target = state.select_one(selector)?;
        if !state.dom.is_form_control(target) {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input, select or textarea".into(),
                actual: state.tag_of(target),
            });
        }
        state.dom.value(target)
    }

    pub fn attribute_of(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        let target = state.select_one(selector)?;
        Ok(state.dom.attr(target, &name.to_ascii_lowercase()))
    }

    /// Replaces the children of the element with one text node.
    pub fn set_text_content(&self, selector: &str, text: &str) -> Result<()> {
        self.mutate(selector, |dom, target| dom.set_text_content(target, text))
    }

    /// Rewrites the element's first text node in place, the way a script
    /// assigning `node.data` does.
    pub fn set_character_data(&self, selector: &str, text: &str) -> Result<()> {
        self.mutate(selector, |dom, target| {
            let text_node = dom
                .first_text_child(target)
                .ok_or_else(|| Error::Dom(format!("{selector} has no text node")))?;
            dom.set_text_content(text_node, text)
        })
    }

    pub fn set_attribute(&self, selector: &str, name: &str, value: &str) -> Result<()> {
        self.mutate(selector, |dom, target| dom.set_attr(target, name, value))
    }

    pub fn remove_attribute(&self, selector: &str, name: &str) -> Result<()> {
        self.mutate(selector, |dom, target| dom.remove_attr(target, name))
    }

    pub fn set_inner_html(&self, selector: &str, html: &str) -> Result<()> {
        let fragment = parse_html(html)?;
        self.mutate(selector, |dom, target| dom.replace_children(target, &fragment))
    }

    pub fn append_html(&self, selector: &str, html: &str) -> Result<()> {
        let fragment = parse_html(html)?;
        self.mutate(selector, |dom, target| dom.append_fragment(target, &fragment))
    }

    pub fn remove(&self, selector: &str) -> Result<()> {
        self.mutate(selector, |dom, target| dom.remove_node(target))
    }

    /// Writes the `value` property the way a script does: no events fire and
    /// no mutation is recorded.
    pub fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let target = state.select_one(selector)?;
            let is_control = state.dom.element(target).is_some_and(is_form_control_element);
            if !is_control {
                return Err(Error::TypeMismatch {
                    selector: selector.to_string(),
                    expected: "input, select or textarea".into(),
                    actual: state.tag_of(target),
                });
            }
            state.dom.set_value(target, value)?;
        }
        self.checkpoint()
    }

    /// Replaces the value of a text control and fires `input` then `keyup`.
    pub fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let target = {
            let mut state = self.state.borrow_mut();
            let target = state.select_one(selector)?;
            let is_text_entry = state.dom.element(target).is_some_and(is_text_entry_element);
            if !is_text_entry {
                return Err(Error::TypeMismatch {
                    selector: selector.to_string(),
                    expected: "text input or textarea".into(),
                    actual: state.tag_of(target),
                });
            }
            state.dom.set_value(target, text)?;
            target
        };
        self.dispatch_event(target, NativeEvent::Input.as_str())?;
        self.dispatch_event(target, NativeEvent::KeyUp.as_str())
    }

    /// Selects the option carrying `value` and fires `input` then `change`.
    pub fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let target = {
            let mut state = self.state.borrow_mut();
            let target = state.select_one(selector)?;
            let is_select = state.dom.element(target).is_some_and(is_select_element);
            if !is_select {
                return Err(Error::TypeMismatch {
                    selector: selector.to_string(),
                    expected: "select".into(),
                    actual: state.tag_of(target),
                });
            }
            if !state.dom.has_option_value(target, value) {
                return Err(Error::Dom(format!(
                    "{selector} has no option with value {value:?}"
                )));
            }
            state.dom.set_value(target, value)?;
            target
        };
        self.dispatch_event(target, NativeEvent::Input.as_str())?;
        self.dispatch_event(target, NativeEvent::Change.as_str())
    }

    /// Fires `event` at the element; it bubbles through every ancestor.
    pub fn dispatch(&self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_event(target, event)
    }

    pub fn now_ms(&self) -> i64 {
        self.state.borrow().scheduler.now_ms
    }

    pub fn advance_time(&self, delta_ms: i64) -> Result<()> {
        self.ensure_not_in_timer()?;
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = {
            let mut state = self.state.borrow_mut();
            let from = state.scheduler.now_ms;
            state.scheduler.now_ms = from.saturating_add(delta_ms);
            from
        };
        let ran = self.run_due_timers_internal()?;
        let mut state = self.state.borrow_mut();
        let to = state.scheduler.now_ms;
        state.trace_timer_line(format!(
            "[timer] advance delta_ms={delta_ms} from={from} to={to} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn advance_time_to(&self, target_ms: i64) -> Result<()> {
        self.ensure_not_in_timer()?;
        let from = {
            let mut state = self.state.borrow_mut();
            let from = state.scheduler.now_ms;
            if target_ms < from {
                return Err(Error::Timer(format!(
                    "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
                )));
            }
            state.scheduler.now_ms = target_ms;
            from
        };
        let ran = self.run_due_timers_internal()?;
        self.state.borrow_mut().trace_timer_line(format!(
            "[timer] advance_to from={from} to={target_ms} ran_due={ran}"
        ));
        Ok(())
    }

    pub fn run_due_timers(&self) -> Result<usize> {
        self.ensure_not_in_timer()?;
        let ran = self.run_due_timers_internal()?;
        let mut state = self.state.borrow_mut();
        let now_ms = state.scheduler.now_ms;
        state.trace_timer_line(format!("[timer] run_due now_ms={now_ms} ran={ran}"));
        Ok(ran)
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let state = self.state.borrow();
        let mut timers = state
            .scheduler
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                interval_ms: task.interval_ms,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn clear_all_timers(&self) -> usize {
        let cleared = {
            let mut state = self.state.borrow_mut();
            let cleared = std::mem::take(&mut state.scheduler.task_queue);
            if state.scheduler.running_timer_id.is_some() {
                state.scheduler.running_timer_canceled = true;
            }
            state.trace_timer_line(format!("[timer] clear_all cleared={}", cleared.len()));
            cleared
        };
        cleared.len()
    }

    pub fn set_timer_step_limit(&self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.state.borrow_mut().scheduler.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn mutation_watcher_count(&self) -> usize {
        self.state.borrow().watchers.len()
    }

    pub fn enable_trace(&self, enabled: bool) {
        self.state.borrow_mut().trace.enabled = enabled;
    }

    pub fn set_trace_stderr(&self, enabled: bool) {
        self.state.borrow_mut().trace.to_stderr = enabled;
    }

    pub fn set_trace_events(&self, enabled: bool) {
        self.state.borrow_mut().trace.events = enabled;
    }

    pub fn set_trace_timers(&self, enabled: bool) {
        self.state.borrow_mut().trace.timers = enabled;
    }

    pub fn set_trace_mutations(&self, enabled: bool) {
        self.state.borrow_mut().trace.mutations = enabled;
    }

    pub fn set_trace_log_limit(&self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        state.trace.log_limit = max_entries;
        while state.trace.logs.len() > state.trace.log_limit {
            state.trace.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&self) -> Vec<String> {
        self.state.borrow_mut().trace.logs.drain(..).collect()
    }

    /// Selector-event library living on this page.
    pub fn event_bridge(&self) -> PageEventBridge {
        PageEventBridge {
            state: Rc::downgrade(&self.state),
        }
    }

    fn mutate(
        &self,
        selector: &str,
        apply: impl FnOnce(&mut Dom, NodeId) -> Result<()>,
    ) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let target = state.select_one(selector)?;
            apply(&mut state.dom, target)?;
        }
        self.checkpoint()
    }

    fn dispatch_event(&self, target: NodeId, event: &str) -> Result<()> {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            let callbacks = state.listeners_on_path(target, event);
            let label = state.dom.node_label(target);
            state.trace_event_line(format!(
                "[event] dispatch {event} target={label} listeners={}",
                callbacks.len()
            ));
            callbacks
        };

        for (id, callback) in callbacks {
            let active = self.state.borrow().has_listener(id);
            if active {
                self.run_in_task(|| callback());
            }
            self.checkpoint()?;
        }
        self.checkpoint()
    }

    fn run_in_task(&self, run: impl FnOnce()) {
        self.state.borrow_mut().task_depth += 1;
        run();
        self.state.borrow_mut().task_depth -= 1;
    }

    /// Delivers queued mutation records unless a callback is still running.
    fn checkpoint(&self) -> Result<()> {
        {
            let state = self.state.borrow();
            if state.task_depth > 0 || !state.dom.has_pending_records() {
                return Ok(());
            }
        }
        self.deliver_mutations()
    }

    fn deliver_mutations(&self) -> Result<()> {
        let mut rounds = 0usize;
        loop {
            let pending = {
                let mut state = self.state.borrow_mut();
                let records = state.dom.take_records();
                if records.is_empty() {
                    return Ok(());
                }
                rounds += 1;
                if rounds > state.scheduler.timer_step_limit {
                    return Err(Error::Dom(format!(
                        "mutation delivery did not settle after {} rounds",
                        state.scheduler.timer_step_limit
                    )));
                }
                let pending = state.matching_watchers(&records);
                state.trace_mutation_line(format!(
                    "[mutation] deliver records={} watchers={}",
                    records.len(),
                    pending.len()
                ));
                pending
            };

            for (id, callback) in pending {
                let active = self.state.borrow().has_watcher(id);
                if active {
                    self.run_in_task(|| callback());
                }
            }
        }
    }

    fn ensure_not_in_timer(&self) -> Result<()> {
        if self.state.borrow().scheduler.running_timer_id.is_some() {
            return Err(Error::Timer(
                "timers cannot be advanced from inside a timer callback".into(),
            ));
        }
        Ok(())
    }

    fn run_due_timers_internal(&self) -> Result<usize> {
        let due_limit = self.state.borrow().scheduler.now_ms;

        let mut steps = 0usize;
        loop {
            let mut task = {
                let mut state = self.state.borrow_mut();
                let Some(next_idx) = state.scheduler.next_task_index(due_limit) else {
                    break;
                };
                steps += 1;
                if steps > state.scheduler.timer_step_limit {
                    return Err(state.scheduler.step_limit_error(steps, due_limit));
                }
                let task = state.scheduler.task_queue.remove(next_idx);
                let now_ms = state.scheduler.now_ms;
                state.trace_timer_line(format!(
                    "[timer] run id={} due_at={} interval_ms={} now_ms={now_ms}",
                    task.id, task.due_at, task.interval_ms
                ));
                state.scheduler.running_timer_id = Some(task.id);
                state.scheduler.running_timer_canceled = false;
                task
            };

            self.run_in_task(|| (task.tick)(self));

            let canceled_task = {
                let mut state = self.state.borrow_mut();
                let canceled = state.scheduler.running_timer_canceled;
                state.scheduler.running_timer_id = None;
                state.scheduler.running_timer_canceled = false;
                if canceled {
                    Some(task)
                } else {
                    task.due_at = task.due_at.saturating_add(task.interval_ms);
                    task.order = state.scheduler.allocate_task_order();
                    state.scheduler.task_queue.push(task);
                    None
                }
            };
            drop(canceled_task);
            self.checkpoint()?;
        }
        Ok(steps)
    }

    fn add_listener(&self, node: NodeId, event: &str, callback: Callback) -> Registration {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate_hook_id();
            state.listeners.push(ListenerEntry {
                id,
                node,
                event: event.to_string(),
                callback,
            });
            let label = state.dom.node_label(node);
            state.trace_event_line(format!("[event] listen {event} target={label} id={id}"));
            id
        };

        let state = Rc::downgrade(&self.state);
        Registration::new(move || {
            if let Some(state) = state.upgrade() {
                let removed = state.borrow_mut().remove_listener(id);
                drop(removed);
            }
        })
    }
}

impl Document for Page {
    type Element = NodeId;

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let found = self.state.borrow().dom.query_selector(selector);
        match found {
            Ok(node) => node,
            Err(err) => {
                tracing::debug!(selector, error = %err, "selector could not be parsed");
                None
            }
        }
    }

    fn element_kind(&self, element: &NodeId) -> ElementKind {
        if self.state.borrow().dom.is_form_control(*element) {
            ElementKind::FormControl
        } else {
            ElementKind::Generic
        }
    }

    fn text_content(&self, element: &NodeId) -> String {
        self.state.borrow().dom.text_content(*element)
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.state.borrow().dom.attr(*element, name)
    }

    fn value(&self, element: &NodeId) -> Option<String> {
        let state = self.state.borrow();
        if !state.dom.is_form_control(*element) {
            return None;
        }
        state.dom.value(*element).ok()
    }
}

impl ObservationHost for Page {
    fn watch_mutations(
        &self,
        element: &NodeId,
        watch: MutationWatch,
        callback: Callback,
    ) -> Registration {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate_hook_id();
            state.watchers.push(WatcherEntry {
                id,
                node: *element,
                watch,
                callback,
            });
            let label = state.dom.node_label(*element);
            state.trace_mutation_line(format!("[mutation] observe target={label} id={id}"));
            id
        };

        let state = Rc::downgrade(&self.state);
        Registration::new(move || {
            if let Some(state) = state.upgrade() {
                let removed = state.borrow_mut().remove_watcher(id);
                drop(removed);
            }
        })
    }

    fn listen(&self, element: &NodeId, event: NativeEvent, callback: Callback) -> Registration {
        self.add_listener(*element, event.as_str(), callback)
    }

    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut(&Self)>) -> Registration {
        let interval_ms = i64::try_from(period.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.scheduler.allocate_timer_id();
            let due_at = state.scheduler.now_ms.saturating_add(interval_ms);
            let order = state.scheduler.allocate_task_order();
            state.scheduler.task_queue.push(ScheduledTask {
                id,
                due_at,
                order,
                interval_ms,
                tick,
            });
            state.trace_timer_line(format!(
                "[timer] schedule interval id={id} due_at={due_at} interval_ms={interval_ms}"
            ));
            id
        };

        let state = Rc::downgrade(&self.state);
        Registration::new(move || {
            if let Some(state) = state.upgrade() {
                let removed = state.borrow_mut().cancel_timer(id);
                drop(removed);
            }
        })
    }
}

/// Selector-event library bound to a [`Page`].
///
/// Hooks every name of a space-separated list such as `"change input"` as a
/// plain listener. Declines when the page is gone, the list is empty, or the
/// element is detached.
#[derive(Clone)]
pub struct PageEventBridge {
    state: Weak<RefCell<PageState>>,
}

impl fmt::Debug for PageEventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEventBridge")
            .field("attached", &(self.state.strong_count() > 0))
            .finish()
    }
}

impl EventBridge<NodeId> for PageEventBridge {
    fn on(&self, element: &NodeId, events: &str, callback: Callback) -> Option<Registration> {
        let page = Page {
            state: self.state.upgrade()?,
        };
        let names = events.split_whitespace().collect::<Vec<_>>();
        if names.is_empty() || !page.state.borrow().dom.is_connected(*element) {
            return None;
        }
        let registrations = names
            .into_iter()
            .map(|name| page.add_listener(*element, name, callback.clone()))
            .collect::<Vec<_>>();
        Some(Registration::new(move || drop(registrations)))
    }
}
