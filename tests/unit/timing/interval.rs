use super::*;

fn interval(begin: i64) -> TimeInterval {
    TimeInterval {
        begin: Time::ms(begin),
        end: Time::Indefinite,
        last_dur: Time::Indefinite,
        owner: TimedId(1),
        dependents: Vec::new(),
    }
}

#[test]
fn freed_slots_are_reused() {
    let mut store = IntervalStore::default();
    let a = store.insert(interval(0));
    let b = store.insert(interval(10));
    assert_eq!(store.live_count(), 2);
    assert!(store.remove(a).is_some());
    assert!(store.get(a).is_none());
    let c = store.insert(interval(20));
    assert_eq!(c, a);
    assert_eq!(store.get(b).map(|i| i.begin), Some(Time::ms(10)));
    assert!(store.remove(a).is_some());
    assert!(store.remove(a).is_none());
}
