//! Attaches change detection to the element behind a selector.
//!
//! Generic elements only change through DOM mutation, so one mutation watcher
//! covers them. Form controls are different: a script can assign `value`
//! without emitting an event or a mutation, so they get native listeners, an
//! optional event-bridge hook, and a poll that compares the value over time.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::config::WatchConfig;
use crate::host::{
    Callback, ElementKind, EventBridge, MutationWatch, NativeEvent, ObservationHost, Registration,
    Role, SelectorBinding, Subscription,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Events the bridge is asked to forward, in the bridge's own list syntax.
const BRIDGE_EVENTS: &str = "change input";

pub struct ChangeObserver<H: ObservationHost> {
    host: H,
    bridge: Option<Rc<dyn EventBridge<H::Element>>>,
    poll_interval: Duration,
}

impl<H: ObservationHost> fmt::Debug for ChangeObserver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeObserver")
            .field("bridge", &self.bridge.is_some())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl<H: ObservationHost> ChangeObserver<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            bridge: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(host: H, config: &WatchConfig) -> Self {
        Self::new(host).with_poll_interval(config.poll_interval())
    }

    /// Also hook form controls through a third-party event library.
    pub fn with_bridge(mut self, bridge: Rc<dyn EventBridge<H::Element>>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Sets the value poll period; a zero period is raised to
    /// [`MIN_POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Watches the price element's text and structure.
    ///
    /// Returns `None`, after a warning, when nothing matches `selector`.
    pub fn setup_price_observer(&self, selector: &str, callback: Callback) -> Option<Subscription> {
        let binding = SelectorBinding::new(Role::Price, selector);
        let element = self.resolve(&binding)?;
        let registration =
            self.host
                .watch_mutations(&element, MutationWatch::content(), callback);
        tracing::debug!(selector, "price observer attached");
        Some(Subscription::new(binding, vec![registration]))
    }

    /// Watches the quantity element with the strategy its kind needs.
    ///
    /// Returns `None`, after a warning, when nothing matches `selector`.
    pub fn setup_quantity_observer(
        &self,
        selector: &str,
        callback: Callback,
    ) -> Option<Subscription> {
        let binding = SelectorBinding::new(Role::Quantity, selector);
        let element = self.resolve(&binding)?;
        let registrations = match self.host.element_kind(&element) {
            ElementKind::FormControl => self.watch_form_control(&element, selector, callback),
            ElementKind::Generic => vec![self.host.watch_mutations(
                &element,
                MutationWatch::content_and_value_attributes(),
                callback,
            )],
        };
        tracing::debug!(
            selector,
            hooks = registrations.len(),
            "quantity observer attached"
        );
        Some(Subscription::new(binding, registrations))
    }

    fn resolve(&self, binding: &SelectorBinding) -> Option<H::Element> {
        let element = binding.resolve(&self.host);
        if element.is_none() {
            tracing::warn!(
                "{} not found → {}",
                binding.role.selector_label(),
                binding.selector
            );
        }
        element
    }

    fn watch_form_control(
        &self,
        element: &H::Element,
        selector: &str,
        callback: Callback,
    ) -> Vec<Registration> {
        let mut registrations = NativeEvent::FORM_CONTROL_EVENTS
            .iter()
            .map(|event| self.host.listen(element, *event, callback.clone()))
            .collect::<Vec<_>>();
        registrations.push(self.start_polling(element, selector, callback.clone()));

        if let Some(bridge) = &self.bridge {
            match bridge.on(element, BRIDGE_EVENTS, callback) {
                Some(registration) => registrations.push(registration),
                None => tracing::debug!(selector, "event bridge declined"),
            }
        }
        registrations
    }

    fn start_polling(
        &self,
        element: &H::Element,
        selector: &str,
        callback: Callback,
    ) -> Registration {
        let element = element.clone();
        let selector = selector.to_string();
        let mut last_value = self.host.value(&element);
        self.host.set_interval(
            self.poll_interval,
            Box::new(move |host: &H| {
                let current = host.value(&element);
                if current != last_value {
                    tracing::trace!(
                        selector = selector.as_str(),
                        previous = ?last_value,
                        current = ?current,
                        "poll detected a value change"
                    );
                    last_value = current;
                    callback();
                }
            }),
        )
    }
}
