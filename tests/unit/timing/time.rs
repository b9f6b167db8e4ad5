use super::*;

#[test]
fn sentinel_ordering_is_total() {
    let mut v = vec![
        Time::Unresolved,
        Time::ms(20),
        Time::Indefinite,
        Time::ms(-5),
    ];
    v.sort();
    assert_eq!(
        v,
        vec![Time::ms(-5), Time::ms(20), Time::Indefinite, Time::Unresolved]
    );
}

#[test]
fn greater_than_is_at_or_after() {
    assert!(Time::ms(10).greater_than(Time::ms(10)));
    assert!(!Time::ms(9).greater_than(Time::ms(10)));
    assert!(Time::Indefinite.greater_than(Time::ms(i64::MAX)));
    assert!(Time::Unresolved.greater_than(Time::Indefinite));
    assert!(!Time::Indefinite.greater_than(Time::Unresolved));
}

#[test]
fn offset_only_moves_resolved_times() {
    assert_eq!(Time::ms(1000).offset_by(500), Time::ms(1500));
    assert_eq!(Time::Unresolved.offset_by(500), Time::Unresolved);
    assert!(Time::Indefinite.checked_offset(1).is_err());
}

#[test]
fn clock_values_parse() {
    assert_eq!(parse_clock_value("02:30:03").unwrap(), 9_003_000);
    assert_eq!(parse_clock_value("50:00:10.25").unwrap(), 180_010_250);
    assert_eq!(parse_clock_value("02:33").unwrap(), 153_000);
    assert_eq!(parse_clock_value("00:10.5").unwrap(), 10_500);
    assert_eq!(parse_clock_value("3.2h").unwrap(), 11_520_000);
    assert_eq!(parse_clock_value("45min").unwrap(), 2_700_000);
    assert_eq!(parse_clock_value("30s").unwrap(), 30_000);
    assert_eq!(parse_clock_value("5ms").unwrap(), 5);
    assert_eq!(parse_clock_value("12.467").unwrap(), 12_467);
}

#[test]
fn malformed_clock_values_fail() {
    for bad in ["", "abc", "1:2", "00:61", "1.", ".5s", "10x", "00:10."] {
        assert!(parse_clock_value(bad).is_err(), "{bad} should fail");
    }
}

#[test]
fn duration_accepts_indefinite() {
    assert_eq!(parse_duration("indefinite").unwrap(), Time::Indefinite);
    assert_eq!(parse_duration("2s").unwrap(), Time::ms(2000));
}
