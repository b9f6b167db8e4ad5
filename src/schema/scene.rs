use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    animation::animate::{AnimationDef, AnimationKind},
    foundation::{
        core::{NodeId, Rect, TimedId, Viewport},
        error::{SmilError, SmilResult},
    },
    model::{
        document::{AnimationElement, Document},
        scene::NodeKind,
        traits::TraitId,
    },
    timing::{
        condition::parse_time_conditions,
        element::{FillBehavior, Restart, TimingAttributes},
        time::{Time, parse_duration},
    },
};

/// JSON scene description: a node tree, time containers and animations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDef {
    pub width: u32,
    pub height: u32,
    /// `[min_x, min_y, width, height]` in user units.
    #[serde(default)]
    pub view_box: Option<[f64; 4]>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
    #[serde(default)]
    pub animations: Vec<AnimationElementDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: NodeKind,
    /// Attribute name to attribute text, e.g. `"fill": "#f00"`.
    #[serde(default)]
    pub traits: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<NodeDef>,
}

/// Timing attributes in their attribute-text form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingDef {
    pub begin: String,
    pub end: String,
    pub dur: Option<String>,
    pub repeat_count: Option<String>,
    pub repeat_dur: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub restart: Restart,
    pub fill: FillBehavior,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDef {
    #[serde(default)]
    pub id: Option<String>,
    /// Enclosing container id; the document root when absent.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(flatten)]
    pub timing: TimingDef,
}

fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationElementDef {
    #[serde(default)]
    pub id: Option<String>,
    /// Element id of the animated node.
    pub target: String,
    /// Animated attribute. Defaults to `transform` for `animate_transform`
    /// and `motion` for `animate_motion`.
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(flatten)]
    pub timing: TimingDef,
    #[serde(flatten)]
    pub def: AnimationDef,
}

fn at(path: &str, err: SmilError) -> SmilError {
    match err {
        SmilError::Structure(m) => SmilError::Structure(format!("{path}: {m}")),
        SmilError::Validation(m) => SmilError::Validation(format!("{path}: {m}")),
        SmilError::Animation(m) => SmilError::Animation(format!("{path}: {m}")),
        other => other,
    }
}

fn parse_opt_duration(value: Option<&str>, default: Time) -> SmilResult<Time> {
    value.map_or(Ok(default), parse_duration)
}

impl TimingDef {
    pub fn attributes(&self) -> SmilResult<TimingAttributes> {
        let repeat_count = match self.repeat_count.as_deref().map(str::trim) {
            None => None,
            Some("indefinite") => Some(f32::INFINITY),
            Some(n) => Some(n.parse::<f32>().map_err(|_| {
                SmilError::validation(format!("invalid repeatCount '{n}'"))
            })?),
        };
        let attrs = TimingAttributes {
            dur: parse_opt_duration(self.dur.as_deref(), Time::Indefinite)?,
            repeat_count,
            repeat_dur: self.repeat_dur.as_deref().map(parse_duration).transpose()?,
            min: parse_opt_duration(self.min.as_deref(), Time::ZERO)?,
            max: parse_opt_duration(self.max.as_deref(), Time::Indefinite)?,
            restart: self.restart,
            fill: self.fill,
        };
        attrs.validate()?;
        Ok(attrs)
    }
}

impl SceneDef {
    pub fn from_reader<R: std::io::Read>(r: R) -> SmilResult<Self> {
        serde_json::from_reader(r).map_err(|e| SmilError::serde(format!("parse scene JSON: {e}")))
    }

    pub fn from_json_str(json: &str) -> SmilResult<Self> {
        serde_json::from_str(json).map_err(|e| SmilError::serde(format!("parse scene JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> SmilResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open scene JSON '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Builds the scene, its time containers and its animations. Errors
    /// name the JSON path of the offending entry.
    #[tracing::instrument(skip(self))]
    pub fn build(&self) -> SmilResult<Document> {
        let mut doc = Document::new(Viewport::new(self.width, self.height)?);
        if let Some([x, y, w, h]) = self.view_box {
            doc.scene_mut()
                .set_view_box(Some(Rect::new(x, y, x + w, y + h)))
                .map_err(|e| at("$.view_box", e))?;
        }

        let root = doc.scene().root();
        for (i, node) in self.nodes.iter().enumerate() {
            insert_node(&mut doc, root, node, &format!("$.nodes[{i}]"))?;
        }

        for (i, c) in self.containers.iter().enumerate() {
            let path = format!("$.containers[{i}]");
            add_container(&mut doc, c).map_err(|e| at(&path, e))?;
        }

        for (i, a) in self.animations.iter().enumerate() {
            let path = format!("$.animations[{i}]");
            add_animation(&mut doc, a).map_err(|e| at(&path, e))?;
        }
        tracing::debug!(
            nodes = doc.scene().len(),
            animations = doc.animation_count(),
            "scene built"
        );
        Ok(doc)
    }
}

fn insert_node(doc: &mut Document, parent: NodeId, def: &NodeDef, path: &str) -> SmilResult<()> {
    let scene = doc.scene_mut();
    let id = scene
        .insert(parent, def.kind, def.id.as_deref())
        .map_err(|e| at(path, e))?;
    for (name, value) in &def.traits {
        let t = TraitId::from_name(name)
            .ok_or_else(|| SmilError::validation(format!("{path}.traits: unknown trait '{name}'")))?;
        scene
            .set_trait_str(id, t, value)
            .map_err(|e| at(&format!("{path}.traits.{name}"), e))?;
    }
    for (i, child) in def.children.iter().enumerate() {
        insert_node(doc, id, child, &format!("{path}.children[{i}]"))?;
    }
    Ok(())
}

fn container_id(doc: &Document, label: Option<&str>) -> SmilResult<TimedId> {
    match label {
        None => Ok(doc.timing().root()),
        Some(l) => doc
            .timing()
            .lookup(l)
            .ok_or_else(|| SmilError::structure(format!("unknown time container '{l}'"))),
    }
}

fn add_container(doc: &mut Document, def: &ContainerDef) -> SmilResult<()> {
    let parent = container_id(doc, def.parent.as_deref())?;
    let attrs = def.timing.attributes()?;
    let begin = parse_time_conditions(&def.timing.begin, true)?;
    let end = parse_time_conditions(&def.timing.end, false)?;
    let timing = doc.timing_mut();
    let id = timing.add_container(parent, def.id.as_deref(), attrs, def.speed)?;
    for cond in begin {
        timing.add_condition(id, true, cond)?;
    }
    for cond in end {
        timing.add_condition(id, false, cond)?;
    }
    Ok(())
}

fn add_animation(doc: &mut Document, def: &AnimationElementDef) -> SmilResult<()> {
    let container = container_id(doc, def.container.as_deref())?;
    let target = doc
        .scene()
        .lookup(&def.target)
        .ok_or_else(|| SmilError::structure(format!("unknown target '{}'", def.target)))?;
    let trait_id = match (def.attribute.as_deref(), def.def.kind) {
        (Some(name), _) => TraitId::from_name(name)
            .ok_or_else(|| SmilError::validation(format!("unknown attribute '{name}'")))?,
        (None, AnimationKind::AnimateTransform { .. }) => TraitId::Transform,
        (None, AnimationKind::AnimateMotion) => TraitId::Motion,
        (None, _) => return Err(SmilError::validation("attribute is required")),
    };
    let element = AnimationElement {
        label: def.id.clone(),
        target,
        trait_id,
        def: def.def.clone(),
        timing: def.timing.attributes()?,
        begin: def.timing.begin.clone(),
        end: def.timing.end.clone(),
    };
    doc.add_animation(container, element)?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/schema/scene.rs"]
mod tests;
