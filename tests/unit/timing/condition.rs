use super::*;

#[test]
fn offsets_parse_with_sign_and_spaces() {
    let c = parse_time_conditions("2s; -0.5s;+ 100ms", true).unwrap();
    assert_eq!(
        c,
        vec![
            TimeCondition::Offset { offset: 2000 },
            TimeCondition::Offset { offset: -500 },
            TimeCondition::Offset { offset: 100 },
        ]
    );
}

#[test]
fn sync_base_keeps_dashed_ids() {
    let c = parse_time_conditions("fade-in.end - 1s", true).unwrap();
    assert_eq!(
        c,
        vec![TimeCondition::SyncBase {
            id: "fade-in".into(),
            begin: false,
            offset: -1000,
        }]
    );
}

#[test]
fn events_repeat_and_access_keys() {
    let c = parse_time_conditions("click; a.beginEvent+1s; a.repeat(2); accessKey(x)", true)
        .unwrap();
    assert_eq!(
        c,
        vec![
            TimeCondition::Event {
                base: None,
                event: "click".into(),
                offset: 0,
            },
            TimeCondition::Event {
                base: Some("a".into()),
                event: "beginEvent".into(),
                offset: 1000,
            },
            TimeCondition::Repeat {
                base: Some("a".into()),
                iteration: 2,
                offset: 0,
            },
            TimeCondition::AccessKey { key: 'x', offset: 0 },
        ]
    );
    assert!(c[0].is_event_based());
}

#[test]
fn indefinite_yields_no_condition() {
    assert!(parse_time_conditions("indefinite", true).unwrap().is_empty());
    assert!(parse_time_conditions("indefinite", false).unwrap().is_empty());
}

#[test]
fn malformed_lists_fail() {
    assert!(parse_time_conditions("", true).is_err());
    assert!(parse_time_conditions("1s;;2s", true).is_err());
    assert!(parse_time_conditions("a.begin*2", true).is_err());
    assert!(parse_time_conditions("accessKey()", true).is_err());
}
