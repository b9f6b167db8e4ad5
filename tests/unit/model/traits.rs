use super::*;

#[test]
fn names_round_trip() {
    for t in TraitId::ALL {
        assert_eq!(TraitId::from_name(t.name()), Some(t));
    }
    assert_eq!(TraitId::from_name("stroke-dasharray"), None);
}

#[test]
fn validation_rejects_wrong_shapes() {
    assert!(TraitId::Width.validate(&AnimValue::number(-1.0)).is_err());
    assert!(TraitId::X.validate(&AnimValue::number(-1.0)).is_ok());
    assert!(TraitId::Fill.validate(&AnimValue::number(1.0)).is_err());
    assert!(TraitId::Fill.validate(&AnimValue::Text("none".into())).is_ok());
    assert!(TraitId::Display.validate(&AnimValue::Text("block".into())).is_err());
    assert!(TraitId::Points.validate(&AnimValue::Floats(vec![1.0, 2.0, 3.0])).is_err());
    assert!(
        TraitId::Transform
            .validate(&AnimValue::Matrix(Matrix::IDENTITY))
            .is_ok()
    );
}

#[test]
fn transform_lists_compose_left_to_right() {
    let m = parse_transform_list("translate(10, 5) scale(2)").unwrap();
    assert_eq!(m, Matrix([2.0, 0.0, 0.0, 2.0, 10.0, 5.0]));
    assert!(parse_transform_list("wobble(1)").is_err());
    assert!(parse_transform_list("translate(1").is_err());
    assert_eq!(parse_transform_list("").unwrap(), Matrix::IDENTITY);
}

#[test]
fn attribute_strings_parse_per_trait() {
    assert_eq!(
        TraitId::Fill.parse("#00ff00").unwrap(),
        AnimValue::Floats(vec![0.0, 255.0, 0.0])
    );
    assert_eq!(
        TraitId::Motion.parse("3 4").unwrap(),
        AnimValue::Matrix(Matrix::translate(3.0, 4.0))
    );
    assert!(TraitId::R.parse("-2").is_err());
    assert_eq!(
        TraitId::Visibility.parse("hidden").unwrap(),
        AnimValue::Text("hidden".into())
    );
}
