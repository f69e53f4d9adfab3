use super::*;

#[test]
fn time_arithmetic_and_since() {
    let t = Time::from_secs(2.0) + 0.5;
    assert_eq!(t.secs(), 2.5);
    assert_eq!(t.since(Time::from_secs(1.0)), 1.5);
    assert_eq!(Time::from_secs(1.0).since(t), 0.0);
    assert_eq!(Time::from_millis(1500.0).secs(), 1.5);
    assert_eq!(Time::from_secs(3.0).max(Time::from_secs(4.0)).secs(), 4.0);
}

#[test]
fn duration_and_unit_checks() {
    assert!(is_valid_duration(0.0));
    assert!(!is_valid_duration(-0.1));
    assert!(!is_valid_duration(f64::NAN));
    assert!(is_unit_interval(1.0));
    assert!(!is_unit_interval(1.01));
}

#[test]
fn rng_is_deterministic() {
    let mut a = Rng64::new(7);
    let mut b = Rng64::new(7);
    for _ in 0..16 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
}

#[test]
fn rng_range_is_bounded() {
    let mut r = Rng64::new(42);
    for _ in 0..1000 {
        let v = r.range(-0.5, 0.5);
        assert!((-0.5..0.5).contains(&v));
    }
}
