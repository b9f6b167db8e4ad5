use super::*;
use crate::timing::element::FillBehavior;

fn attrs(dur: i64) -> TimingAttributes {
    TimingAttributes {
        dur: Time::ms(dur),
        ..TimingAttributes::default()
    }
}

fn offset(ms: i64) -> TimeCondition {
    TimeCondition::Offset { offset: ms }
}

fn kinds(g: &mut TimingGraph, id: TimedId) -> Vec<TimingEventKind> {
    g.take_events()
        .into_iter()
        .filter(|e| e.element == id)
        .map(|e| e.kind)
        .collect()
}

#[test]
fn begin_and_end_events_bracket_the_interval() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.initialize().unwrap();

    g.sample(0).unwrap();
    assert!(g.is_active(a));
    assert_eq!(g.local_time(a), Some(0));
    assert_eq!(kinds(&mut g, a), vec![TimingEventKind::Begin]);

    g.sample(500).unwrap();
    assert_eq!(g.local_time(a), Some(500));
    assert!(kinds(&mut g, a).is_empty());

    g.sample(1000).unwrap();
    assert!(!g.is_active(a));
    assert_eq!(g.state(a), Some(TimingState::Fill));
    assert_eq!(g.local_time(a), None);
    assert_eq!(
        kinds(&mut g, a),
        vec![TimingEventKind::LastDurEnd, TimingEventKind::End]
    );
}

#[test]
fn freeze_holds_the_last_simple_time() {
    let mut g = TimingGraph::new();
    let a = g
        .add_element(
            g.root(),
            None,
            TimingAttributes {
                fill: FillBehavior::Freeze,
                ..attrs(1000)
            },
        )
        .unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.sample(100).unwrap();
    g.sample(1500).unwrap();
    assert_eq!(g.state(a), Some(TimingState::Fill));
    assert_eq!(g.local_time(a), Some(1000));
}

#[test]
fn sync_base_offset_resolves_against_the_base_begin() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(2000)).unwrap();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    g.add_condition(a, true, offset(1000)).unwrap();
    g.add_condition(
        b,
        true,
        TimeCondition::SyncBase {
            id: "a".into(),
            begin: true,
            offset: 500,
        },
    )
    .unwrap();
    g.initialize().unwrap();

    let iv = g.current_interval(b).unwrap();
    assert_eq!(iv.begin, Time::ms(1500));
    assert_eq!(iv.end, Time::ms(2500));

    g.sample(1500).unwrap();
    let begins: Vec<Time> = g
        .take_events()
        .into_iter()
        .filter(|e| e.element == b && e.kind == TimingEventKind::Begin)
        .map(|e| e.time)
        .collect();
    assert_eq!(begins, vec![Time::ms(1500)]);
}

#[test]
fn sync_base_declared_after_its_dependent_still_resolves() {
    let mut g = TimingGraph::new();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    let a = g.add_element(g.root(), Some("a"), attrs(2000)).unwrap();
    g.add_condition(
        b,
        true,
        TimeCondition::SyncBase {
            id: "a".into(),
            begin: false,
            offset: 0,
        },
    )
    .unwrap();
    g.add_condition(a, true, offset(250)).unwrap();
    g.initialize().unwrap();
    assert_eq!(g.current_interval(b).map(|i| i.begin), Some(Time::ms(2250)));
}

#[test]
fn sync_base_cycles_are_rejected() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    let on = |id: &str| TimeCondition::SyncBase {
        id: id.into(),
        begin: true,
        offset: 0,
    };
    g.add_condition(a, true, on("b")).unwrap();
    g.add_condition(b, true, on("a")).unwrap();
    let err = g.initialize().unwrap_err();
    assert!(err.is_structural());

    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.add_condition(
        a,
        false,
        TimeCondition::SyncBase {
            id: "a".into(),
            begin: true,
            offset: 10,
        },
    )
    .unwrap();
    assert!(g.initialize().is_err());
}

#[test]
fn unknown_sync_base_is_ignored() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.add_condition(
        a,
        true,
        TimeCondition::SyncBase {
            id: "missing".into(),
            begin: true,
            offset: 0,
        },
    )
    .unwrap();
    g.initialize().unwrap();
    assert_eq!(g.state(a), Some(TimingState::NoInterval));
    g.sample(100).unwrap();
    assert!(!g.is_active(a));
}

#[test]
fn repeat_events_are_emitted_per_iteration() {
    let mut g = TimingGraph::new();
    let a = g
        .add_element(
            g.root(),
            Some("a"),
            TimingAttributes {
                repeat_count: Some(3.0),
                ..attrs(1000)
            },
        )
        .unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.sample(0).unwrap();
    g.take_events();

    g.sample(2500).unwrap();
    assert_eq!(g.local_time(a), Some(500));
    assert_eq!(g.support(a).unwrap().current_iteration(), 2);
    let repeats: Vec<(TimingEventKind, Time)> = g
        .take_events()
        .into_iter()
        .map(|e| (e.kind, e.time))
        .collect();
    assert_eq!(
        repeats,
        vec![
            (TimingEventKind::Repeat(1), Time::ms(1000)),
            (TimingEventKind::Repeat(2), Time::ms(2000)),
        ]
    );
    assert_eq!(g.current_interval(a).map(|i| i.end), Some(Time::ms(3000)));
}

#[test]
fn event_base_begins_in_the_same_sample() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.add_condition(
        b,
        true,
        TimeCondition::Event {
            base: Some("a".into()),
            event: "endEvent".into(),
            offset: 0,
        },
    )
    .unwrap();
    g.sample(0).unwrap();
    assert!(!g.is_active(b));
    g.sample(1000).unwrap();
    assert!(g.is_active(b));
    assert_eq!(g.current_interval(b).map(|i| i.begin), Some(Time::ms(1000)));
}

#[test]
fn external_events_and_access_keys_create_instances() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    let k = g.add_element(g.root(), Some("k"), attrs(1000)).unwrap();
    g.add_condition(
        a,
        true,
        TimeCondition::Event {
            base: None,
            event: "click".into(),
            offset: 100,
        },
    )
    .unwrap();
    g.set_event_base(a, Some("button".into())).unwrap();
    g.add_condition(k, true, TimeCondition::AccessKey { key: 'x', offset: 0 })
        .unwrap();
    g.sample(0).unwrap();

    assert!(!g.dispatch_event("other", "click", Time::ms(200)).unwrap());
    assert!(g.dispatch_event("button", "click", Time::ms(200)).unwrap());
    assert!(g.dispatch_access_key('x', Time::ms(50)).unwrap());
    g.sample(300).unwrap();
    assert!(g.is_active(a));
    assert_eq!(g.local_time(a), Some(0));
    assert_eq!(g.local_time(k), Some(250));
}

#[test]
fn begin_element_at_uses_the_container_time() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.sample(200).unwrap();
    assert_eq!(g.state(a), Some(TimingState::NoInterval));
    g.begin_element_at(a, 0).unwrap();
    g.sample(300).unwrap();
    assert_eq!(g.local_time(a), Some(100));
    g.end_element_at(a, 50).unwrap();
    g.sample(400).unwrap();
    assert!(!g.is_active(a));
}

#[test]
fn seeking_back_returns_to_the_waiting_state() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.add_condition(a, true, offset(1000)).unwrap();
    g.sample(1500).unwrap();
    assert_eq!(g.local_time(a), Some(500));
    g.take_events();

    g.sample(200).unwrap();
    assert!(!g.is_active(a));
    assert_eq!(g.local_time(a), None);
    assert_eq!(g.state(a), Some(TimingState::WaitingFirst));
    // root interval + the recomputed interval of `a`
    assert_eq!(g.interval_count(), 2);

    g.sample(1200).unwrap();
    assert_eq!(g.local_time(a), Some(200));
}

#[test]
fn container_speed_scales_child_time() {
    let mut g = TimingGraph::new();
    let c = g
        .add_container(g.root(), Some("c"), attrs(2000), 2.0)
        .unwrap();
    let x = g.add_element(c, Some("x"), attrs(4000)).unwrap();
    g.add_condition(c, true, offset(1000)).unwrap();
    g.add_condition(x, true, offset(0)).unwrap();

    g.sample(1500).unwrap();
    assert_eq!(g.local_time(c), Some(500));
    assert_eq!(g.local_time(x), Some(1000));
    assert_eq!(g.to_root_time(x, Time::ms(1000)), Time::ms(1500));
    assert_eq!(g.to_container_time(x, Time::ms(1500)), Time::ms(1000));
}

#[test]
fn structural_changes_after_initialize_fail() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    g.initialize().unwrap();
    assert!(g.add_condition(a, true, offset(0)).is_err());
    assert!(g.add_element(g.root(), None, attrs(10)).is_err());
    assert!(g.add_element(a, None, attrs(10)).is_err());
}

#[test]
fn duplicate_labels_and_bad_speed_are_rejected() {
    let mut g = TimingGraph::new();
    g.add_element(g.root(), Some("a"), attrs(1000)).unwrap();
    assert!(g.add_element(g.root(), Some("a"), attrs(1000)).is_err());
    assert!(g.add_container(g.root(), None, attrs(1000), 0.0).is_err());
}

#[test]
fn sync_dependent_follows_a_truncated_base() {
    let mut g = TimingGraph::new();
    let a = g.add_element(g.root(), Some("a"), attrs(2000)).unwrap();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.add_condition(
        a,
        false,
        TimeCondition::Event {
            base: Some("x".into()),
            event: "click".into(),
            offset: 0,
        },
    )
    .unwrap();
    g.add_condition(
        b,
        true,
        TimeCondition::SyncBase {
            id: "a".into(),
            begin: false,
            offset: 0,
        },
    )
    .unwrap();
    g.initialize().unwrap();
    assert_eq!(g.current_interval(b).map(|i| i.begin), Some(Time::ms(2000)));

    g.sample(0).unwrap();
    assert!(g.dispatch_event("x", "click", Time::ms(500)).unwrap());
    g.sample(600).unwrap();
    assert!(!g.is_active(a));
    assert!(g.is_active(b));
    assert_eq!(g.current_interval(b).map(|i| i.begin), Some(Time::ms(500)));
    assert_eq!(g.local_time(b), Some(100));
}

#[test]
fn sync_time_is_converted_through_a_sped_up_container() {
    let mut g = TimingGraph::new();
    let c = g
        .add_container(g.root(), Some("c"), attrs(5000), 2.0)
        .unwrap();
    let a = g.add_element(c, Some("a"), attrs(1000)).unwrap();
    let b = g.add_element(g.root(), Some("b"), attrs(1000)).unwrap();
    g.add_condition(c, true, offset(100)).unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.add_condition(
        b,
        true,
        TimeCondition::SyncBase {
            id: "a".into(),
            begin: false,
            offset: 0,
        },
    )
    .unwrap();

    g.sample(200).unwrap();
    assert!(g.is_active(a));
    assert_eq!(g.current_interval(b).map(|i| i.begin), Some(Time::ms(600)));
    g.sample(700).unwrap();
    assert!(!g.is_active(a));
    assert!(g.is_active(b));
    assert_eq!(g.local_time(b), Some(100));
}

#[test]
fn long_jumps_emit_a_bounded_number_of_repeats() {
    let mut g = TimingGraph::new();
    let a = g
        .add_element(
            g.root(),
            Some("a"),
            TimingAttributes {
                repeat_count: Some(f32::INFINITY),
                ..attrs(1)
            },
        )
        .unwrap();
    g.add_condition(a, true, offset(0)).unwrap();
    g.sample(0).unwrap();
    g.take_events();

    g.sample(1_000_000).unwrap();
    let repeats: Vec<TimingEventKind> = kinds(&mut g, a)
        .into_iter()
        .filter(|k| matches!(k, TimingEventKind::Repeat(_)))
        .collect();
    assert_eq!(repeats.len(), 1024);
    assert_eq!(repeats.last(), Some(&TimingEventKind::Repeat(1_000_000)));
    assert_eq!(g.support(a).unwrap().current_iteration(), 1_000_000);
}
