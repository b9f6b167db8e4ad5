use super::*;

#[test]
fn manual_clock_clones_share_time() {
    let a = ManualClock::new(100);
    let b = a.clone();
    a.advance(40);
    assert_eq!(b.now_ms(), 140);
    b.set(5);
    assert_eq!(a.now_ms(), 5);
}

#[test]
fn system_clock_is_monotonic() {
    let c = SystemClock::new();
    let t0 = c.now_ms();
    assert!(t0 >= 0);
    assert!(c.now_ms() >= t0);
}
