use super::*;
use crate::animation::segment::LeafSegment;

fn floats(values: &[f32]) -> RefValues {
    let segments = values
        .windows(2)
        .map(|w| Segment::from(LeafSegment::float(vec![w[0]], vec![w[1]]).unwrap()))
        .collect();
    let mut rv = RefValues::new(segments).unwrap();
    rv.initialize();
    rv
}

#[test]
fn table_is_cumulative_and_ends_at_one() {
    let rv = floats(&[0.0, 1.0, 4.0, 4.5]);
    assert_eq!(rv.length(), 4.5);
    let table = rv.normalized_lengths();
    assert_eq!(table.len(), 3);
    assert!((table[0] - 1.0 / 4.5).abs() < 1e-6);
    assert!((table[1] - 4.0 / 4.5).abs() < 1e-6);
    assert_eq!(table[2], 1.0);
    assert_eq!(rv.segment_length(1), 3.0);
}

#[test]
fn degenerate_values_still_reach_the_last_key() {
    let rv = floats(&[3.0, 3.0, 3.0]);
    assert_eq!(rv.length(), 0.0);
    assert_eq!(rv.normalized_lengths(), &[0.5, 1.0]);
    assert_eq!(rv.segment_at_dist(1.0), (1, 1.0));
}

#[test]
fn compute_at_one_is_exactly_the_end_value() {
    let rv = floats(&[0.1, 0.7, 0.3]);
    assert_eq!(rv.compute(1, 1.0), AnimValue::number(0.3));
    assert_eq!(rv.last_value(), AnimValue::number(0.3));
    assert_eq!(rv.first_value(), AnimValue::number(0.1));
    // out of range indices clamp to the last segment
    assert_eq!(rv.compute(9, 1.0), AnimValue::number(0.3));
}

#[test]
fn segment_at_dist_maps_into_segments() {
    let rv = floats(&[0.0, 10.0, 20.0]);
    assert_eq!(rv.segment_at_dist(0.25), (0, 0.5));
    assert_eq!(rv.segment_at_dist(0.75), (1, 0.5));
    assert_eq!(rv.segment_at_dist(-0.5), (0, 0.0));
}

#[test]
fn make_discrete_appends_a_zero_length_hold() {
    let mut rv = floats(&[0.0, 10.0]);
    rv.make_discrete();
    rv.initialize();
    assert_eq!(rv.segment_count(), 2);
    assert_eq!(rv.segment_length(1), 0.0);
    assert_eq!(rv.compute(1, 0.0), AnimValue::number(10.0));
    assert_eq!(*rv.normalized_lengths().last().unwrap(), 1.0);
}

#[test]
fn empty_reference_values_are_rejected() {
    assert!(RefValues::new(Vec::new()).unwrap_err().is_structural());
}
