use super::*;
use crate::animation::value::AnimValue;

const SCENE: &str = r##"{
  "width": 100,
  "height": 80,
  "view_box": [0, 0, 50, 40],
  "nodes": [
    { "kind": "group", "id": "g", "traits": { "fill": "#00ff00" }, "children": [
      { "kind": "rect", "id": "box", "traits": { "width": "10", "height": "10" } }
    ] },
    { "kind": "circle", "id": "dot", "traits": { "r": "4", "cx": "20", "cy": "20" } }
  ],
  "containers": [
    { "id": "slow", "begin": "1s", "speed": 0.5 }
  ],
  "animations": [
    { "element": "animate", "target": "box", "attribute": "x",
      "from": "0", "to": "40", "dur": "2s", "fill": "freeze" },
    { "element": "animate_transform", "type": "translate", "target": "dot",
      "values": "0 0;10 0", "dur": "1s", "container": "slow", "id": "move" },
    { "element": "set", "target": "dot", "attribute": "visibility",
      "to": "hidden", "begin": "move.end", "dur": "indefinite" }
  ]
}"##;

#[test]
fn builds_nodes_containers_and_animations() {
    let def = SceneDef::from_json_str(SCENE).unwrap();
    let mut doc = def.build().unwrap();
    let scene = doc.scene();
    let b = scene.lookup("box").unwrap();
    let dot = scene.lookup("dot").unwrap();
    assert_eq!(scene.parent(b), scene.lookup("g"));
    assert_eq!(doc.animation_count(), 3);
    assert!(doc.timing().lookup("slow").is_some());

    doc.sample(0).unwrap();
    doc.sample(1000).unwrap();
    assert_eq!(doc.scene().get_trait(b, TraitId::X).unwrap(), AnimValue::number(20.0));
    assert_eq!(doc.active_animations(dot, TraitId::Transform).len(), 1);

    doc.sample(3500).unwrap();
    assert_eq!(doc.scene().get_trait(b, TraitId::X).unwrap(), AnimValue::number(40.0));
    assert_eq!(
        doc.scene().get_trait(dot, TraitId::Visibility).unwrap(),
        AnimValue::Text("hidden".into())
    );
}

#[test]
fn timing_text_is_parsed() {
    let t = TimingDef {
        dur: Some("00:01.5".into()),
        repeat_count: Some("indefinite".into()),
        min: Some("100ms".into()),
        ..TimingDef::default()
    };
    let attrs = t.attributes().unwrap();
    assert_eq!(attrs.dur, Time::ms(1500));
    assert_eq!(attrs.repeat_count, Some(f32::INFINITY));
    assert_eq!(attrs.min, Time::ms(100));
    assert_eq!(attrs.max, Time::Indefinite);

    let bad = TimingDef {
        repeat_count: Some("-1".into()),
        ..TimingDef::default()
    };
    assert!(matches!(bad.attributes(), Err(SmilError::Validation(_))));
}

#[test]
fn errors_name_the_offending_entry() {
    let json = r#"{ "width": 10, "height": 10,
        "nodes": [ { "kind": "rect", "traits": { "width": "-3" } } ] }"#;
    let err = SceneDef::from_json_str(json).unwrap().build().unwrap_err();
    assert!(err.to_string().contains("$.nodes[0].traits.width"), "{err}");

    let json = r#"{ "width": 10, "height": 10,
        "nodes": [ { "kind": "rect", "id": "a" } ],
        "animations": [ { "element": "animate", "target": "b", "attribute": "x", "to": "1" } ] }"#;
    let err = SceneDef::from_json_str(json).unwrap().build().unwrap_err();
    assert!(matches!(&err, SmilError::Structure(m) if m.starts_with("$.animations[0]")), "{err}");

    let json = r#"{ "width": 10, "height": 10,
        "nodes": [ { "kind": "rect", "id": "a" } ],
        "animations": [ { "element": "animate", "target": "a", "to": "1" } ] }"#;
    assert!(SceneDef::from_json_str(json).unwrap().build().is_err());

    assert!(matches!(
        SceneDef::from_json_str(r#"{ "width": 10 }"#),
        Err(SmilError::Serde(_))
    ));
    assert!(SceneDef::from_path("/nonexistent/scene.json").is_err());
}
