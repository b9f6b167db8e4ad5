use super::*;

fn inst(id: u32, t: Time) -> TimeInstance {
    TimeInstance {
        id: InstanceId(id),
        time: t,
        is_begin: true,
        clear_on_reset: false,
        sync: None,
    }
}

#[test]
fn insert_keeps_sorted_and_stable() {
    let mut v = Vec::new();
    insert_sorted(&mut v, inst(0, Time::ms(30)));
    insert_sorted(&mut v, inst(1, Time::Unresolved));
    insert_sorted(&mut v, inst(2, Time::ms(10)));
    insert_sorted(&mut v, inst(3, Time::ms(30)));
    let ids: Vec<u32> = v.iter().map(|i| i.id.0).collect();
    assert_eq!(ids, vec![2, 0, 3, 1]);
}

#[test]
fn time_after_variants() {
    let v = vec![inst(0, Time::ms(10)), inst(1, Time::ms(20))];
    assert_eq!(time_after(Time::ms(10), &v), Some(Time::ms(10)));
    assert_eq!(time_after_strict(Time::ms(10), &v), Some(Time::ms(20)));
    assert_eq!(time_after(Time::ms(21), &v), None);
}
