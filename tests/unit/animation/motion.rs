use super::*;
use crate::animation::refvalues::RefValues;

fn path(d: &str) -> BezPath {
    BezPath::from_svg(d).unwrap()
}

#[test]
fn two_equal_cubics_split_the_path_in_half() {
    let p = path("M0,0 C0,10 10,10 10,0 C10,-10 20,-10 20,0");
    let mut rv = RefValues::new(segments_from_path(&p, MotionRotate::Auto).unwrap()).unwrap();
    rv.initialize();
    assert_eq!(rv.segment_count(), 2);
    assert!((rv.segment_length(0) - rv.segment_length(1)).abs() < 1e-3);

    let (si, sp) = rv.segment_at_dist(0.5);
    match si {
        0 => assert!(sp > 0.99),
        1 => assert!(sp < 0.01),
        other => panic!("unexpected segment {other}"),
    }
    assert_eq!(*rv.normalized_lengths().last().unwrap(), 1.0);
}

#[test]
fn lines_and_close_become_leaves() {
    let p = path("M10,10 L20,10 L20,20 Z");
    let segs = segments_from_path(&p, MotionRotate::default()).unwrap();
    assert_eq!(segs.len(), 3);
    let end = segs[2].end_value().as_matrix().unwrap();
    assert_eq!((end.0[4], end.0[5]), (10.0, 10.0));
}

#[test]
fn move_only_path_holds_its_point() {
    let segs = segments_from_path(&path("M5,6"), MotionRotate::default()).unwrap();
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].length(), 0.0);
}

#[test]
fn quadratic_curves_are_flattened() {
    let segs = segments_from_path(&path("M0,0 Q50,100 100,0"), MotionRotate::Auto).unwrap();
    let Segment::Composite(c) = &segs[0] else {
        panic!("expected a composite segment");
    };
    assert!(c.children().len() > 2);
    // flattened polyline is shorter than the control polygon
    assert!(segs[0].length() < 2.0 * 111.81);
}

#[test]
fn auto_rotate_follows_the_tangent() {
    let leaf = motion_leaf(Point::ZERO, Point::new(0.0, 10.0), MotionRotate::Auto);
    let m = leaf.compute(0.0).as_matrix().unwrap();
    assert!((m.0[1] - 1.0).abs() < 1e-6);

    let rev = motion_leaf(Point::ZERO, Point::new(10.0, 0.0), MotionRotate::AutoReverse);
    let m = rev.compute(0.0).as_matrix().unwrap();
    assert!((m.0[0] + 1.0).abs() < 1e-6);

    let fixed = motion_leaf(Point::ZERO, Point::new(10.0, 0.0), MotionRotate::Angle(90.0));
    let m = fixed.compute(1.0).as_matrix().unwrap();
    assert!((m.0[1] - 1.0).abs() < 1e-6);
    assert_eq!(m.0[4], 10.0);
}

#[test]
fn rotate_values_parse() {
    assert_eq!(MotionRotate::parse("auto").unwrap(), MotionRotate::Auto);
    assert_eq!(
        MotionRotate::parse(" auto-reverse ").unwrap(),
        MotionRotate::AutoReverse
    );
    assert_eq!(MotionRotate::parse("45").unwrap(), MotionRotate::Angle(45.0));
    assert!(MotionRotate::parse("sideways").is_err());
}

#[test]
fn point_lists_build_straight_segments() {
    let pts = [Point::new(0.0, 0.0), Point::new(3.0, 4.0), Point::new(3.0, 0.0)];
    let segs = segments_from_points(&pts, MotionRotate::default()).unwrap();
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0].length(), 5.0);
    assert_eq!(segments_from_points(&pts[..1], MotionRotate::default()).unwrap().len(), 1);
    assert!(segments_from_points(&[], MotionRotate::default()).is_err());
}
