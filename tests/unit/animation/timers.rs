use super::*;

fn t(secs: f64) -> Time {
    Time::from_secs(secs)
}

#[test]
fn fires_in_time_then_insertion_order() {
    let mut timers = Timers::new();
    timers.schedule(t(2.0), 0, "c");
    timers.schedule(t(1.0), 0, "a");
    timers.schedule(t(1.0), 0, "b");

    assert!(timers.due(t(0.5)).is_empty());
    assert_eq!(timers.due(t(1.0)), vec!["a", "b"]);
    assert_eq!(timers.next_deadline(), Some(t(2.0)));
    assert_eq!(timers.due(t(9.0)), vec!["c"]);
    assert!(timers.is_empty());
}

#[test]
fn cancel_by_id_and_group() {
    let mut timers = Timers::new();
    let a = timers.schedule(t(1.0), 1, 'a');
    timers.schedule(t(1.0), 2, 'b');
    timers.schedule(t(2.0), 2, 'c');

    assert!(timers.cancel(a));
    assert!(!timers.cancel(a));
    assert_eq!(timers.cancel_group(2), 2);
    assert!(timers.due(t(5.0)).is_empty());
}

#[test]
fn pop_due_reports_deadline_and_group() {
    let mut timers = Timers::new();
    timers.schedule(t(0.25), 7, ());
    let (at, group, ()) = timers.pop_due(t(1.0)).unwrap();
    assert_eq!(at, t(0.25));
    assert_eq!(group, 7);
    assert!(timers.pop_due(t(1.0)).is_none());
}
