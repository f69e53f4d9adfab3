use super::*;

fn t(secs: f64) -> Time {
    Time::from_secs(secs)
}

#[test]
fn linear_tween_interpolates_and_completes() {
    let mut tw = Tweener::<&str>::new();
    tw.set("v", 0.0);
    let id = tw.to("v", 1.0, 2.0, Ease::Linear, 0.0);

    assert!(tw.advance(t(1.0)).is_empty());
    assert!((tw.value(&"v").unwrap() - 0.5).abs() < 1e-9);

    let done = tw.advance(t(2.5));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, id);
    assert_eq!(done[0].at, t(2.0));
    assert_eq!(tw.value(&"v"), Some(1.0));
    assert!(!tw.is_tweening(&"v"));
}

#[test]
fn delayed_tween_captures_start_value_late() {
    let mut tw = Tweener::<u8>::new();
    tw.set(1, 0.2);
    tw.to(1, 1.0, 1.0, Ease::Linear, 1.0);
    tw.advance(t(0.5));
    assert_eq!(tw.value(&1), Some(0.2));

    tw.advance(t(1.5));
    assert!((tw.value(&1).unwrap() - 0.6).abs() < 1e-9);
}

#[test]
fn new_tween_overwrites_in_flight_tween_on_same_key() {
    let mut tw = Tweener::<u8>::new();
    tw.set(0, 0.0);
    let first = tw.to(0, 1.0, 2.0, Ease::Linear, 0.0);
    tw.advance(t(1.0));
    let second = tw.to(0, 0.0, 1.0, Ease::Linear, 0.0);

    let done = tw.advance(t(5.0));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, second);
    assert_ne!(done[0].id, first);
    assert_eq!(tw.value(&0), Some(0.0));
}

#[test]
fn zero_duration_snaps_and_reports_on_next_advance() {
    let mut tw = Tweener::<u8>::new();
    tw.set(0, 0.0);
    tw.to(0, 0.7, 0.0, Ease::Linear, 0.0);
    assert_eq!(tw.value(&0), Some(0.7));
    assert_eq!(tw.advance(t(0.0)).len(), 1);
    assert!(tw.advance(t(0.1)).is_empty());
}

#[test]
fn kill_keeps_current_value() {
    let mut tw = Tweener::<u8>::new();
    tw.set(0, 0.0);
    tw.to(0, 1.0, 1.0, Ease::Linear, 0.0);
    tw.advance(t(0.25));
    tw.kill(&0);
    assert!(tw.advance(t(2.0)).is_empty());
    assert!((tw.value(&0).unwrap() - 0.25).abs() < 1e-9);
}

#[test]
fn kill_where_filters_by_predicate() {
    let mut tw = Tweener::<(u8, u8)>::new();
    tw.set((0, 0), 0.0);
    tw.set((1, 0), 0.0);
    tw.to((0, 0), 1.0, 1.0, Ease::Linear, 0.0);
    tw.to((1, 0), 1.0, 1.0, Ease::Linear, 0.0);
    tw.kill_where(|k| k.0 == 0);
    assert_eq!(tw.active_len(), 1);
    assert!(tw.is_tweening(&(1, 0)));
}

#[test]
fn start_in_the_past_resumes_partially_progressed() {
    let mut tw = Tweener::<u8>::new();
    tw.set(0, 0.0);
    tw.advance(t(10.0));
    tw.to_at(0, 1.0, 2.0, Ease::Linear, t(9.0));
    tw.advance(t(10.0));
    assert!((tw.value(&0).unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn time_never_moves_backwards() {
    let mut tw = Tweener::<u8>::new();
    tw.advance(t(3.0));
    tw.advance(t(1.0));
    assert_eq!(tw.now(), t(3.0));
}
