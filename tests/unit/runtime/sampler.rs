use super::*;
use crate::runtime::clock::ManualClock;

#[test]
fn pause_freezes_and_play_resumes_from_paused_time() {
    let clock = ManualClock::new(1_000);
    let mut s = SmilSampler::new(Arc::new(clock.clone()));
    s.play();
    clock.advance(300);
    assert_eq!(s.tick(), 300);
    s.pause();
    clock.advance(5_000);
    assert_eq!(s.tick(), 300);
    s.play();
    assert_eq!(s.tick(), 300);
    clock.advance(40);
    assert_eq!(s.tick(), 340);
}

#[test]
fn fixed_increment_ignores_the_clock() {
    let clock = ManualClock::new(0);
    let mut s = SmilSampler::new(Arc::new(clock.clone()));
    s.set_time_increment(Some(40));
    s.play();
    assert_eq!(s.tick(), 0);
    clock.advance(1_000);
    assert_eq!(s.tick(), 40);
    assert_eq!(s.tick(), 80);
    s.stop();
    assert_eq!(s.tick(), 0);
    assert!(!s.is_playing());
}

#[test]
fn seek_moves_time_while_playing() {
    let clock = ManualClock::new(0);
    let mut s = SmilSampler::new(Arc::new(clock.clone()));
    s.play();
    clock.advance(100);
    s.seek(2_000);
    assert_eq!(s.tick(), 2_000);
    clock.advance(10);
    assert_eq!(s.tick(), 2_010);
}
