use super::*;

use std::time::Duration;

fn quiet_trace(page: &Page) {
    page.enable_trace(true);
    page.set_trace_stderr(false);
}

#[test]
fn set_timer_step_limit_rejects_zero() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    match page.set_timer_step_limit(0) {
        Err(Error::Timer(message)) => assert!(message.contains("at least 1")),
        other => panic!("expected timer error, got: {other:?}"),
    }
    page.set_timer_step_limit(3)?;
    Ok(())
}

#[test]
fn set_trace_log_limit_rejects_zero() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    assert!(matches!(
        page.set_trace_log_limit(0),
        Err(Error::InvalidConfig(_))
    ));
    Ok(())
}

#[test]
fn advance_time_rejects_negative_and_backwards_moves() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    assert!(matches!(page.advance_time(-1), Err(Error::Timer(_))));
    page.advance_time_to(50)?;
    assert_eq!(page.now_ms(), 50);
    assert!(matches!(page.advance_time_to(10), Err(Error::Timer(_))));
    assert_eq!(page.now_ms(), 50);
    Ok(())
}

#[test]
fn intervals_requeue_in_due_order() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let (fast_count, fast) = counting_callback();
    let (slow_count, slow) = counting_callback();
    let _fast = page.set_interval(Duration::from_millis(10), Box::new(move |_: &Page| fast()));
    let _slow = page.set_interval(Duration::from_millis(25), Box::new(move |_: &Page| slow()));

    let timers = page.pending_timers();
    assert_eq!(
        timers
            .iter()
            .map(|timer| (timer.id, timer.due_at))
            .collect::<Vec<_>>(),
        vec![(1, 10), (2, 25)]
    );

    page.advance_time(30)?;
    assert_eq!(fast_count.get(), 3);
    assert_eq!(slow_count.get(), 1);

    let timers = page.pending_timers();
    assert_eq!(timers[0].due_at, 40);
    assert_eq!(timers[1].due_at, 50);
    Ok(())
}

#[test]
fn run_due_timers_runs_only_currently_due_tasks() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let (count, tick) = counting_callback();
    let _interval = page.set_interval(Duration::from_millis(5), Box::new(move |_: &Page| tick()));

    assert_eq!(page.run_due_timers()?, 0);
    page.advance_time_to(5)?;
    assert_eq!(count.get(), 1);
    assert_eq!(page.run_due_timers()?, 0);
    Ok(())
}

#[test]
fn zero_period_interval_is_clamped() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let _interval = page.set_interval(Duration::ZERO, Box::new(|_: &Page| {}));
    assert_eq!(page.pending_timers()[0].interval_ms, 1);
    Ok(())
}

#[test]
fn clear_all_timers_empties_pending_queue() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let (count, tick) = counting_callback();
    let interval = page.set_interval(Duration::from_millis(5), Box::new(move |_: &Page| tick()));
    assert_eq!(page.clear_all_timers(), 1);
    assert!(page.pending_timers().is_empty());
    page.advance_time(100)?;
    assert_eq!(count.get(), 0);
    // Releasing an already-cleared timer is a no-op.
    interval.release();
    Ok(())
}

#[test]
fn interval_can_cancel_itself_from_its_tick() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let slot = Rc::new(std::cell::RefCell::new(None::<Registration>));
    let (count, callback) = counting_callback();
    let handle = Rc::clone(&slot);
    let registration = page.set_interval(
        Duration::from_millis(10),
        Box::new(move |_: &Page| {
            callback();
            if let Some(registration) = handle.borrow_mut().take() {
                registration.release();
            }
        }),
    );
    *slot.borrow_mut() = Some(registration);

    page.advance_time(100)?;
    assert_eq!(count.get(), 1);
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn runaway_interval_hits_the_step_limit() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    page.set_timer_step_limit(5)?;
    let _interval = page.set_interval(Duration::from_millis(1), Box::new(|_: &Page| {}));
    match page.advance_time(100) {
        Err(Error::Timer(message)) => {
            assert!(
                message.contains("exceeded max task steps"),
                "unexpected message: {message}"
            );
            assert!(message.contains("limit=5"), "unexpected message: {message}");
        }
        other => panic!("expected step limit error, got: {other:?}"),
    }
    Ok(())
}

#[test]
fn timers_cannot_be_advanced_from_a_tick() -> Result<()> {
    let page = Page::from_html("<p>x</p>")?;
    let outcome = Rc::new(std::cell::RefCell::new(None));
    let seen = Rc::clone(&outcome);
    let _interval = page.set_interval(
        Duration::from_millis(10),
        Box::new(move |page: &Page| {
            *seen.borrow_mut() = Some(page.advance_time(1));
        }),
    );
    page.advance_time(10)?;
    assert!(matches!(
        outcome.borrow().as_ref(),
        Some(Err(Error::Timer(_)))
    ));
    Ok(())
}

#[test]
fn dispatch_bubbles_to_ancestor_listeners() -> Result<()> {
    let page = Page::from_html(r#"<form id="cart"><input id="qty" value="1"></form>"#)?;
    let form = page.select_one("#cart")?;
    let (count, callback) = counting_callback();
    let _listener = page.listen(&form, NativeEvent::Change, callback);

    page.dispatch("#qty", "change")?;
    assert_eq!(count.get(), 1);
    page.dispatch("#qty", "input")?;
    assert_eq!(count.get(), 1);
    Ok(())
}

#[test]
fn listener_removed_during_dispatch_does_not_run() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    let target = page.select_one("#qty")?;
    let (count, second) = counting_callback();
    let slot = Rc::new(std::cell::RefCell::new(None::<Registration>));
    let handle = Rc::clone(&slot);
    let _first = page.listen(
        &target,
        NativeEvent::Input,
        Rc::new(move || {
            handle.borrow_mut().take();
        }),
    );
    *slot.borrow_mut() = Some(page.listen(&target, NativeEvent::Input, second));

    page.dispatch("#qty", "input")?;
    assert_eq!(count.get(), 0);
    assert_eq!(page.listener_count(), 1);
    Ok(())
}

#[test]
fn set_value_records_no_mutation() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    let target = page.select_one("#qty")?;
    let (count, callback) = counting_callback();
    let _watch = page.watch_mutations(
        &target,
        MutationWatch {
            attributes: true,
            ..MutationWatch::default()
        },
        callback,
    );

    page.set_value("#qty", "2")?;
    assert_eq!(count.get(), 0);
    assert_eq!(page.value_of("#qty")?, "2");
    assert_eq!(page.attribute_of("#qty", "value")?, Some("1".to_string()));

    page.set_attribute("#qty", "value", "3")?;
    assert_eq!(count.get(), 1);
    assert_eq!(page.value_of("#qty")?, "2");
    Ok(())
}

#[test]
fn attribute_filter_limits_attribute_records() -> Result<()> {
    let page = Page::from_html(r#"<div id="w"></div>"#)?;
    let target = page.select_one("#w")?;
    let (count, callback) = counting_callback();
    let _watch = page.watch_mutations(
        &target,
        MutationWatch {
            attributes: true,
            attribute_filter: vec!["data-value".to_string()],
            ..MutationWatch::default()
        },
        callback,
    );

    page.set_attribute("#w", "title", "x")?;
    assert_eq!(count.get(), 0);
    page.set_attribute("#w", "DATA-VALUE", "2")?;
    assert_eq!(count.get(), 1);
    page.set_text_content("#w", "text")?;
    assert_eq!(count.get(), 1);
    Ok(())
}

#[test]
fn non_subtree_watch_ignores_descendants() -> Result<()> {
    let page = Page::from_html(r#"<div id="w"><span id="inner">1</span></div>"#)?;
    let target = page.select_one("#w")?;
    let (count, callback) = counting_callback();
    let _watch = page.watch_mutations(
        &target,
        MutationWatch {
            child_list: true,
            character_data: true,
            ..MutationWatch::default()
        },
        callback,
    );

    page.set_text_content("#inner", "2")?;
    assert_eq!(count.get(), 0);
    page.append_html("#w", "<span>3</span>")?;
    assert_eq!(count.get(), 1);
    Ok(())
}

#[test]
fn form_actions_check_element_types() -> Result<()> {
    let page = Page::from_html(
        r#"
        <div id="box">1</div>
        <input id="check" type="checkbox">
        <select id="sel"><option value="1">1</option></select>
        "#,
    )?;

    match page.type_text("#box", "2") {
        Err(Error::TypeMismatch {
            selector,
            expected,
            actual,
        }) => {
            assert_eq!(selector, "#box");
            assert_eq!(expected, "text input or textarea");
            assert_eq!(actual, "div");
        }
        other => panic!("expected type mismatch, got: {other:?}"),
    }
    assert!(matches!(
        page.type_text("#check", "x"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        page.select_option("#box", "1"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        page.set_value("#box", "1"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(page.value_of("#box"), Err(Error::TypeMismatch { .. })));
    assert!(matches!(page.select_option("#sel", "9"), Err(Error::Dom(_))));
    assert!(matches!(
        page.set_text_content("#missing", "1"),
        Err(Error::SelectorNotFound(selector)) if selector == "#missing"
    ));
    Ok(())
}

#[test]
fn set_character_data_requires_a_text_node() -> Result<()> {
    let page = Page::from_html(r#"<span id="empty"></span>"#)?;
    assert!(matches!(
        page.set_character_data("#empty", "1"),
        Err(Error::Dom(_))
    ));
    Ok(())
}

#[test]
fn remove_detaches_element_and_notifies_parent_watchers() -> Result<()> {
    let page = Page::from_html(r#"<div id="box"><span id="price">1</span></div>"#)?;
    let target = page.select_one("#box")?;
    let (count, callback) = counting_callback();
    let _watch = page.watch_mutations(&target, MutationWatch::content(), callback);

    page.remove("#price")?;
    assert_eq!(count.get(), 1);
    assert_eq!(page.count("#price")?, 0);
    assert!(page.query_selector("#price").is_none());
    Ok(())
}

#[test]
fn trace_logs_capture_events_timers_and_mutations() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" class="amount" value="1">"#)?;
    quiet_trace(&page);
    let observer = ChangeObserver::new(page.clone());
    let (_, callback) = counting_callback();
    let _subscription = observer.setup_quantity_observer("#qty", callback);

    page.type_text("#qty", "2")?;
    page.advance_time(100)?;
    page.set_attribute("#qty", "title", "x")?;

    let logs = page.take_trace_logs();
    assert!(
        logs.iter()
            .any(|line| line == "[event] dispatch input target=input#qty.amount listeners=1"),
        "unexpected logs: {logs:?}"
    );
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[timer] run id=1 due_at=100 interval_ms=100")),
        "unexpected logs: {logs:?}"
    );
    assert!(
        logs.iter()
            .any(|line| line == "[timer] advance delta_ms=100 from=0 to=100 ran_due=1"),
        "unexpected logs: {logs:?}"
    );
    assert!(
        logs.iter()
            .any(|line| line == "[mutation] deliver records=1 watchers=0"),
        "unexpected logs: {logs:?}"
    );
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_categories_can_be_disabled() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    quiet_trace(&page);
    page.set_trace_events(false);
    page.set_trace_mutations(false);
    let _interval = page.set_interval(Duration::from_millis(10), Box::new(|_: &Page| {}));
    page.dispatch("#qty", "input")?;
    page.set_attribute("#qty", "title", "x")?;
    page.advance_time(10)?;

    let logs = page.take_trace_logs();
    assert!(!logs.is_empty());
    assert!(logs.iter().all(|line| line.starts_with("[timer]")), "{logs:?}");

    page.set_trace_timers(false);
    page.advance_time(10)?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_newest_entries() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    quiet_trace(&page);
    page.set_trace_log_limit(2)?;
    for event in ["a", "b", "c"] {
        page.dispatch("#qty", event)?;
    }
    let logs = page.take_trace_logs();
    assert_eq!(
        logs,
        vec![
            "[event] dispatch b target=input#qty listeners=0".to_string(),
            "[event] dispatch c target=input#qty listeners=0".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn trace_is_off_by_default() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    page.dispatch("#qty", "input")?;
    page.advance_time(10)?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn page_debug_reports_hook_counts() -> Result<()> {
    let page = Page::from_html(r#"<input id="qty" value="1">"#)?;
    let _interval = page.set_interval(Duration::from_millis(10), Box::new(|_: &Page| {}));
    let rendered = format!("{page:?}");
    assert!(rendered.contains("timers: 1"), "{rendered}");
    Ok(())
}
