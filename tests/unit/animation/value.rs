use super::*;

#[test]
fn floats_add_componentwise() {
    let a = AnimValue::Floats(vec![1.0, 2.0]);
    let b = AnimValue::Floats(vec![10.0, 20.0]);
    assert_eq!(a.sum(&b).unwrap(), AnimValue::Floats(vec![11.0, 22.0]));
    assert!(a.sum(&AnimValue::number(1.0)).is_err());
    assert_eq!(
        AnimValue::Floats(vec![2.0, 3.0]).multiply(3).unwrap(),
        AnimValue::Floats(vec![6.0, 9.0])
    );
}

#[test]
fn transforms_compose_and_power() {
    let base = AnimValue::Matrix(Matrix::translate(10.0, 0.0));
    let anim = AnimValue::Matrix(Matrix::scale(2.0, 2.0));
    let m = base.sum(&anim).unwrap().as_matrix().unwrap();
    // scale first, then translate
    assert_eq!(m, Matrix([2.0, 0.0, 0.0, 2.0, 10.0, 0.0]));

    let step = AnimValue::Matrix(Matrix::translate(5.0, 1.0));
    let m = step.multiply(3).unwrap().as_matrix().unwrap();
    assert_eq!(m, Matrix::translate(15.0, 3.0));
}

#[test]
fn strings_are_not_additive() {
    let s = AnimValue::Text("inline".into());
    assert!(s.sum(&s).unwrap_err().is_structural());
    assert!(s.multiply(2).is_err());
    assert!(AnimValue::number(1.0).sum(&s).is_err());
}

#[test]
fn colors_parse_in_all_forms() {
    let rgb = |s| parse_value(ValueSyntax::Color, s).unwrap();
    assert_eq!(rgb("#f00"), AnimValue::Floats(vec![255.0, 0.0, 0.0]));
    assert_eq!(rgb("#0080ff"), AnimValue::Floats(vec![0.0, 128.0, 255.0]));
    assert_eq!(rgb("rgb(1, 2, 3)"), AnimValue::Floats(vec![1.0, 2.0, 3.0]));
    assert_eq!(rgb("Navy"), AnimValue::Floats(vec![0.0, 0.0, 128.0]));
    assert!(parse_value(ValueSyntax::Color, "#12").is_err());
    assert!(parse_value(ValueSyntax::Color, "chartreuse").is_err());
}

#[test]
fn numbers_and_keywords_parse() {
    assert_eq!(
        parse_value(ValueSyntax::Number, " 2.5 ").unwrap(),
        AnimValue::number(2.5)
    );
    assert!(parse_value(ValueSyntax::Number, "1 2").is_err());
    assert_eq!(
        parse_value(ValueSyntax::NumberList, "1,2 3").unwrap(),
        AnimValue::Floats(vec![1.0, 2.0, 3.0])
    );
    assert!(parse_value(ValueSyntax::NumberList, "1,x").is_err());
    assert_eq!(
        parse_value(ValueSyntax::Keyword, "hidden").unwrap(),
        AnimValue::Text("hidden".into())
    );
}

#[test]
fn display_is_compact() {
    assert_eq!(AnimValue::Floats(vec![1.0, 2.5]).to_string(), "1 2.5");
    assert_eq!(
        AnimValue::Matrix(Matrix::IDENTITY).to_string(),
        "matrix(1 0 0 1 0 0)"
    );
}
