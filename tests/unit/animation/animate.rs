use super::*;

fn number_trait() -> TargetTrait {
    TargetTrait {
        kind: TraitKind::Float,
        syntax: ValueSyntax::Number,
    }
}

fn keyword_trait() -> TargetTrait {
    TargetTrait {
        kind: TraitKind::Text,
        syntax: ValueSyntax::Keyword,
    }
}

fn motion_trait() -> TargetTrait {
    TargetTrait {
        kind: TraitKind::Motion,
        syntax: ValueSyntax::NumberList,
    }
}

fn at(time: i64, dur: i64) -> SimpleTime {
    SimpleTime {
        time,
        simple_dur: Time::ms(dur),
        iteration: 0,
    }
}

fn animate(values: &str) -> AnimationDef {
    AnimationDef {
        values: Some(values.to_owned()),
        ..AnimationDef::new(AnimationKind::Animate)
    }
}

fn compile(def: &AnimationDef, target: TargetTrait) -> Animation {
    Animation::compile(def, target).unwrap().unwrap()
}

fn number_at(anim: &Animation, at: SimpleTime, underlying: f32) -> f32 {
    anim.value_at(at, || Ok(AnimValue::number(underlying)))
        .unwrap()
        .as_number()
        .unwrap()
}

#[test]
fn linear_values_split_time_evenly() {
    let a = compile(&animate("0;10;30"), number_trait());
    assert_eq!(a.ref_times(), &[0.0, 0.5]);
    assert_eq!(number_at(&a, at(500, 2000), 0.0), 5.0);
    assert_eq!(number_at(&a, at(1500, 2000), 0.0), 20.0);
    assert_eq!(number_at(&a, at(2000, 2000), 0.0), 30.0);
}

#[test]
fn unresolved_simple_duration_samples_the_start() {
    let a = compile(&animate("4;8"), number_trait());
    let t = SimpleTime {
        time: 700,
        simple_dur: Time::Indefinite,
        iteration: 0,
    };
    assert_eq!(number_at(&a, t, 0.0), 4.0);
}

#[test]
fn keyword_traits_are_discrete() {
    let a = compile(&animate("a;b;c"), keyword_trait());
    assert_eq!(a.calc_mode(), CalcMode::Discrete);
    let text = |t| {
        a.value_at(at(t, 900), || Ok(AnimValue::Text("base".into())))
            .unwrap()
            .as_text()
            .unwrap()
            .to_owned()
    };
    assert_eq!(text(0), "a");
    assert_eq!(text(400), "b");
    assert_eq!(text(700), "c");
    assert_eq!(text(900), "c");
}

#[test]
fn to_animation_starts_from_the_underlying_value() {
    let def = AnimationDef {
        to: Some("20".into()),
        ..AnimationDef::new(AnimationKind::Animate)
    };
    let a = compile(&def, number_trait());
    assert!(a.is_to_animation());
    assert!(a.needs_underlying());
    assert_eq!(number_at(&a, at(500, 1000), 10.0), 15.0);
    assert_eq!(number_at(&a, at(1000, 1000), 10.0), 20.0);
}

#[test]
fn by_animation_is_always_additive() {
    let def = AnimationDef {
        by: Some("5".into()),
        ..AnimationDef::new(AnimationKind::Animate)
    };
    let a = compile(&def, number_trait());
    assert!(a.is_additive());
    assert_eq!(number_at(&a, at(1000, 1000), 10.0), 15.0);
}

#[test]
fn from_by_adds_up_to_the_end_value() {
    let def = AnimationDef {
        from: Some("2".into()),
        by: Some("3".into()),
        ..AnimationDef::new(AnimationKind::Animate)
    };
    let a = compile(&def, number_trait());
    assert!(!a.is_additive());
    assert_eq!(number_at(&a, at(1000, 1000), 100.0), 5.0);
}

#[test]
fn from_alone_is_rejected_and_no_source_has_no_effect() {
    let def = AnimationDef {
        from: Some("2".into()),
        ..AnimationDef::new(AnimationKind::Animate)
    };
    assert!(Animation::compile(&def, number_trait()).is_err());

    let empty = AnimationDef::new(AnimationKind::Animate);
    assert!(Animation::compile(&empty, number_trait()).unwrap().is_none());
}

#[test]
fn key_times_reshape_the_timeline() {
    let def = AnimationDef {
        key_times: Some(vec![0.0, 0.8, 1.0]),
        ..animate("0;10;20")
    };
    let a = compile(&def, number_trait());
    assert_eq!(a.ref_times(), &[0.0, 0.8]);
    assert_eq!(number_at(&a, at(400, 1000), 0.0), 5.0);
    assert!((number_at(&a, at(900, 1000), 0.0) - 15.0).abs() < 1e-3);
}

#[test]
fn malformed_key_times_fail() {
    for kt in [vec![0.0, 1.0], vec![0.1, 0.5, 1.0], vec![0.0, 0.5, 0.9], vec![0.0, 0.6, 0.5, 1.0]] {
        let def = AnimationDef {
            key_times: Some(kt.clone()),
            ..animate("0;10;20")
        };
        assert!(Animation::compile(&def, number_trait()).is_err(), "{kt:?}");
    }

    let discrete = AnimationDef {
        key_times: Some(vec![0.0, 0.2, 0.9]),
        calc_mode: Some(CalcMode::Discrete),
        ..animate("0;10;20")
    };
    let a = compile(&discrete, number_trait());
    assert_eq!(number_at(&a, at(500, 1000), 0.0), 10.0);
    assert_eq!(number_at(&a, at(950, 1000), 0.0), 20.0);
}

#[test]
fn paced_timing_follows_value_distance() {
    let def = AnimationDef {
        calc_mode: Some(CalcMode::Paced),
        ..animate("0;10;30")
    };
    let a = compile(&def, number_trait());
    assert!((a.ref_times()[1] - 1.0 / 3.0).abs() < 1e-6);
    assert!((number_at(&a, at(500, 3000), 0.0) - 5.0).abs() < 1e-3);
    assert!((number_at(&a, at(2000, 3000), 0.0) - 20.0).abs() < 1e-3);
}

#[test]
fn spline_mode_needs_one_spline_per_interval() {
    let def = AnimationDef {
        calc_mode: Some(CalcMode::Spline),
        key_splines: Some(vec![[0.0, 0.0, 1.0, 1.0]]),
        ..animate("0;10;20")
    };
    assert!(Animation::compile(&def, number_trait()).is_err());

    let def = AnimationDef {
        key_splines: Some(vec![[0.42, 0.0, 1.0, 1.0]]),
        ..def
    };
    let def = AnimationDef {
        values: Some("0;10".into()),
        ..def
    };
    let a = compile(&def, number_trait());
    assert!(number_at(&a, at(250, 1000), 0.0) < 2.5);
}

#[test]
fn accumulate_builds_on_the_last_value() {
    let def = AnimationDef {
        accumulate: true,
        ..animate("0;10")
    };
    let a = compile(&def, number_trait());
    let iter2 = |time| SimpleTime {
        iteration: 2,
        ..at(time, 1000)
    };
    assert_eq!(number_at(&a, iter2(0), 0.0), 20.0);
    assert_eq!(number_at(&a, iter2(1000), 0.0), 30.0);
}

#[test]
fn set_holds_its_value() {
    let def = AnimationDef {
        to: Some("7".into()),
        additive: true,
        ..AnimationDef::new(AnimationKind::Set)
    };
    let a = compile(&def, number_trait());
    assert!(!a.is_additive());
    assert_eq!(number_at(&a, at(0, 1000), 1.0), 7.0);
    assert_eq!(number_at(&a, at(999, 1000), 1.0), 7.0);
}

#[test]
fn animate_transform_rotates_in_degrees() {
    let def = AnimationDef {
        from: Some("0".into()),
        to: Some("90".into()),
        ..AnimationDef::new(AnimationKind::AnimateTransform {
            transform: TransformType::Rotate,
        })
    };
    let target = TargetTrait {
        kind: TraitKind::Transform,
        syntax: ValueSyntax::NumberList,
    };
    let a = compile(&def, target);
    let m = a
        .value_at(at(1000, 1000), || Ok(AnimValue::Matrix(Matrix::IDENTITY)))
        .unwrap()
        .as_matrix()
        .unwrap();
    assert!((m.0[1] - 1.0).abs() < 1e-6);

    let bad = Animation::compile(&def, number_trait());
    assert!(bad.is_err());
}

#[test]
fn motion_values_translate_along_points() {
    let def = AnimationDef {
        values: Some("0,0; 10,0; 10,30".into()),
        ..AnimationDef::new(AnimationKind::AnimateMotion)
    };
    let a = compile(&def, motion_trait());
    assert_eq!(a.calc_mode(), CalcMode::Paced);
    let m = a
        .value_at(at(250, 1000), || Ok(AnimValue::Matrix(Matrix::IDENTITY)))
        .unwrap()
        .as_matrix()
        .unwrap();
    assert!((m.0[4] - 10.0).abs() < 1e-3);
    assert!(m.0[5].abs() < 1e-3);
}

#[test]
fn key_points_remap_progress_along_the_path() {
    let def = AnimationDef {
        path: Some("M0,0 L100,0".into()),
        calc_mode: Some(CalcMode::Linear),
        key_points: Some(vec![1.0, 0.0]),
        key_times: Some(vec![0.0, 1.0]),
        ..AnimationDef::new(AnimationKind::AnimateMotion)
    };
    let a = compile(&def, motion_trait());
    let x = |t| {
        a.value_at(at(t, 1000), || Ok(AnimValue::Matrix(Matrix::IDENTITY)))
            .unwrap()
            .as_matrix()
            .unwrap()
            .0[4]
    };
    assert_eq!(x(0), 100.0);
    assert!((x(250) - 75.0).abs() < 1e-3);

    let missing = AnimationDef {
        key_times: None,
        ..def
    };
    assert!(Animation::compile(&missing, motion_trait()).is_err());
}

#[test]
fn additive_string_animation_is_a_structure_error() {
    let def = AnimationDef {
        additive: true,
        ..animate("visible;hidden")
    };
    let err = Animation::compile(&def, keyword_trait()).unwrap_err();
    assert!(matches!(err, SmilError::Structure(_)), "{err}");

    let def = AnimationDef {
        accumulate: true,
        ..animate("visible;hidden")
    };
    assert!(matches!(
        Animation::compile(&def, keyword_trait()),
        Err(SmilError::Structure(_))
    ));
}
