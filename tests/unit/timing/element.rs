use super::*;
use crate::timing::instance::{InstanceId, insert_sorted};

fn support(attrs: TimingAttributes, begins: &[i64], ends: &[i64]) -> TimedElementSupport {
    let mut s = TimedElementSupport::new(attrs).unwrap();
    for (i, b) in begins.iter().enumerate() {
        insert_sorted(
            &mut s.begin_instances,
            TimeInstance {
                id: InstanceId(i as u32),
                time: Time::ms(*b),
                is_begin: true,
                clear_on_reset: false,
                sync: None,
            },
        );
        s.begin_conditions.push(TimeCondition::Offset { offset: *b });
    }
    for (i, e) in ends.iter().enumerate() {
        insert_sorted(
            &mut s.end_instances,
            TimeInstance {
                id: InstanceId(100 + i as u32),
                time: Time::ms(*e),
                is_begin: false,
                clear_on_reset: false,
                sync: None,
            },
        );
        s.end_conditions.push(TimeCondition::Offset { offset: *e });
    }
    s
}

fn dur(ms: i64) -> TimingAttributes {
    TimingAttributes {
        dur: Time::ms(ms),
        ..TimingAttributes::default()
    }
}

#[test]
fn first_interval_uses_simple_duration() {
    let s = support(dur(1000), &[500], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.begin, Time::ms(500));
    assert_eq!(iv.end, Time::ms(1500));
    assert_eq!(iv.last_dur, Time::ms(1500));
}

#[test]
fn repeat_count_scales_active_duration() {
    let attrs = TimingAttributes {
        repeat_count: Some(2.5),
        ..dur(1000)
    };
    let s = support(attrs, &[0], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(2500));
}

#[test]
fn indefinite_repeat_with_repeat_dur_clamps() {
    let attrs = TimingAttributes {
        repeat_count: Some(f32::INFINITY),
        repeat_dur: Some(Time::ms(3200)),
        ..dur(1000)
    };
    let s = support(attrs, &[0], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(3200));
}

#[test]
fn end_instance_truncates_and_min_extends() {
    let s = support(dur(1000), &[0], &[400]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(400));
    assert_eq!(iv.last_dur, Time::ms(400));

    let attrs = TimingAttributes {
        min: Time::ms(700),
        ..dur(1000)
    };
    let s = support(attrs, &[0], &[400]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(700));
}

#[test]
fn max_below_min_disables_clamps() {
    let attrs = TimingAttributes {
        min: Time::ms(700),
        max: Time::ms(300),
        ..dur(1000)
    };
    let s = support(attrs, &[0], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(1000));
}

#[test]
fn restart_always_truncates_at_next_begin() {
    let s = support(dur(1000), &[0, 600], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.end, Time::ms(600));
    let next = s.compute_next_interval(iv, Time::Indefinite).unwrap().unwrap();
    assert_eq!(next.begin, Time::ms(600));
    assert_eq!(next.end, Time::ms(1600));
    assert!(s.compute_next_interval(next, Time::Indefinite).unwrap().is_none());
}

#[test]
fn begin_past_container_end_yields_no_interval() {
    let s = support(dur(1000), &[5000], &[]);
    assert!(s.compute_first_interval(Time::ms(5000)).unwrap().is_none());
    assert!(s.compute_first_interval(Time::ms(6000)).unwrap().is_some());
}

#[test]
fn negative_interval_is_skipped() {
    let s = support(dur(1000), &[-3000, 200], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    assert_eq!(iv.begin, Time::ms(200));
}

#[test]
fn local_time_wraps_and_freezes_on_last_value() {
    let attrs = TimingAttributes {
        repeat_count: Some(2.0),
        fill: FillBehavior::Freeze,
        ..dur(1000)
    };
    let mut s = support(attrs, &[0], &[]);
    let iv = s.compute_first_interval(Time::Indefinite).unwrap().unwrap();
    s.simple_dur = Time::ms(1000);
    s.state = TimingState::Playing;
    assert_eq!(s.local_time(Time::ms(1250), Some(iv), None), Some(250));
    s.state = TimingState::Fill;
    assert_eq!(s.local_time(Time::ms(5000), None, Some(iv)), Some(1000));
}

#[test]
fn attributes_reject_bad_repeat_count() {
    let attrs = TimingAttributes {
        repeat_count: Some(0.0),
        ..TimingAttributes::default()
    };
    assert!(TimedElementSupport::new(attrs).is_err());
}
