use kurbo::{BezPath, Point};

use crate::{
    animation::{
        motion::{MotionRotate, segments_from_path, segments_from_points},
        refvalues::RefValues,
        segment::{LeafSegment, Segment, TransformType},
        spline::KeySpline,
        value::{AnimValue, TraitKind, ValueSyntax, parse_numbers, parse_value},
    },
    foundation::{
        error::{SmilError, SmilResult},
        math::Matrix,
    },
    timing::time::Time,
};

/// Interpolation mode between key values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcMode {
    Discrete,
    Linear,
    Paced,
    Spline,
}

/// Animation element type.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum AnimationKind {
    Animate,
    Set,
    AnimateColor,
    AnimateTransform {
        #[serde(rename = "type")]
        transform: TransformType,
    },
    AnimateMotion,
}

impl AnimationKind {
    fn default_calc_mode(self) -> CalcMode {
        match self {
            AnimationKind::Set => CalcMode::Discrete,
            AnimationKind::AnimateMotion => CalcMode::Paced,
            _ => CalcMode::Linear,
        }
    }
}

/// Animation values as they appear on an animation element, before compilation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationDef {
    #[serde(flatten)]
    pub kind: AnimationKind,
    /// `;`-separated key values.
    #[serde(default)]
    pub values: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    /// Motion path data (`animateMotion` only).
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub calc_mode: Option<CalcMode>,
    #[serde(default)]
    pub key_times: Option<Vec<f32>>,
    #[serde(default)]
    pub key_splines: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub key_points: Option<Vec<f32>>,
    #[serde(default)]
    pub rotate: MotionRotate,
    #[serde(default)]
    pub additive: bool,
    #[serde(default)]
    pub accumulate: bool,
}

impl AnimationDef {
    pub fn new(kind: AnimationKind) -> Self {
        Self {
            kind,
            values: None,
            from: None,
            to: None,
            by: None,
            path: None,
            calc_mode: None,
            key_times: None,
            key_splines: None,
            key_points: None,
            rotate: MotionRotate::default(),
            additive: false,
            accumulate: false,
        }
    }
}

/// The trait an animation targets, as far as value parsing is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetTrait {
    pub kind: TraitKind,
    /// Lexical form for float and keyword traits. Ignored for transforms and motion.
    pub syntax: ValueSyntax,
}

/// Sample position of an animation's timed element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleTime {
    /// Time within the current simple duration, in ms.
    pub time: i64,
    pub simple_dur: Time,
    /// Zero-based repeat iteration.
    pub iteration: u32,
}

/// One parsed key value, before it is paired into segments.
#[derive(Clone, Debug, PartialEq)]
enum Key {
    Floats(Vec<f32>),
    Params(TransformType, [f32; 3]),
    Point(Point),
    Text(String),
}

impl Key {
    fn add(&self, other: &Key) -> SmilResult<Key> {
        match (self, other) {
            (Key::Floats(a), Key::Floats(b)) if a.len() == b.len() => {
                Ok(Key::Floats(a.iter().zip(b).map(|(x, y)| x + y).collect()))
            }
            (Key::Params(t, a), Key::Params(_, b)) => {
                Ok(Key::Params(*t, [a[0] + b[0], a[1] + b[1], a[2] + b[2]]))
            }
            (Key::Point(a), Key::Point(b)) => Ok(Key::Point(*a + b.to_vec2())),
            _ => Err(SmilError::validation("'from' and 'by' values do not add up")),
        }
    }

    fn zero_like(&self) -> SmilResult<Key> {
        match self {
            Key::Floats(v) => Ok(Key::Floats(vec![0.0; v.len()])),
            // identity for each transform type
            Key::Params(t, _) => Ok(Key::Params(
                *t,
                if *t == TransformType::Scale {
                    [1.0, 1.0, 0.0]
                } else {
                    [0.0; 3]
                },
            )),
            Key::Point(_) => Ok(Key::Point(Point::ZERO)),
            Key::Text(_) => Err(SmilError::validation("'by' animation needs an additive value")),
        }
    }
}

/// A compiled animation: reference values, timing table and flags.
///
/// Evaluation is a pure function of the sample position and the underlying
/// value, see [`Animation::value_at`].
#[derive(Clone, Debug)]
pub struct Animation {
    kind: AnimationKind,
    trait_kind: TraitKind,
    calc_mode: CalcMode,
    ref_values: RefValues,
    ref_times: Vec<f32>,
    splines: Vec<KeySpline>,
    key_points: Option<Vec<f32>>,
    additive: bool,
    accumulate: bool,
    to_animation: bool,
}

impl Animation {
    /// Compiles `def` for a trait. `Ok(None)` means the element has no value
    /// source and therefore no effect.
    pub fn compile(def: &AnimationDef, target: TargetTrait) -> SmilResult<Option<Animation>> {
        check_target(def.kind, target)?;

        let mut calc_mode = def.calc_mode.unwrap_or(def.kind.default_calc_mode());
        if !target.kind.supports_interpolation() || def.kind == AnimationKind::Set {
            calc_mode = CalcMode::Discrete;
        }

        let Some(selected) = select_values(def, target)? else {
            return Ok(None);
        };
        let Selected {
            mut ref_values,
            additive,
            to_animation,
        } = selected;
        let accumulate = def.accumulate && def.kind != AnimationKind::Set && !to_animation;
        if (additive || accumulate) && target.kind == TraitKind::Text {
            return Err(SmilError::structure(
                "string traits cannot be additive or accumulate",
            ));
        }

        if calc_mode == CalcMode::Discrete {
            ref_values.make_discrete();
        }
        ref_values.initialize();

        let key_points = if def.kind == AnimationKind::AnimateMotion {
            def.key_points.clone()
        } else {
            None
        };
        let ref_times = ref_times(def, calc_mode, &ref_values, key_points.as_deref())?;

        let splines = if calc_mode == CalcMode::Spline {
            let specs = def
                .key_splines
                .as_ref()
                .ok_or_else(|| SmilError::validation("calcMode 'spline' requires keySplines"))?;
            if specs.len() != ref_times.len() {
                return Err(SmilError::validation(format!(
                    "expected {} keySplines, got {}",
                    ref_times.len(),
                    specs.len()
                )));
            }
            specs
                .iter()
                .map(|[x1, y1, x2, y2]| KeySpline::new(*x1, *y1, *x2, *y2))
                .collect::<SmilResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Some(Animation {
            kind: def.kind,
            trait_kind: target.kind,
            calc_mode,
            ref_values,
            ref_times,
            splines,
            key_points: key_points.filter(|_| calc_mode != CalcMode::Paced),
            additive: additive && def.kind != AnimationKind::Set,
            accumulate,
            to_animation,
        }))
    }

    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    pub fn trait_kind(&self) -> TraitKind {
        self.trait_kind
    }

    pub fn calc_mode(&self) -> CalcMode {
        self.calc_mode
    }

    pub fn ref_values(&self) -> &RefValues {
        &self.ref_values
    }

    /// Start time of each time segment, as a fraction of the simple duration.
    pub fn ref_times(&self) -> &[f32] {
        &self.ref_times
    }

    pub fn is_additive(&self) -> bool {
        self.additive
    }

    pub fn is_to_animation(&self) -> bool {
        self.to_animation
    }

    /// `true` when [`Animation::value_at`] reads the underlying value.
    pub fn needs_underlying(&self) -> bool {
        self.additive || self.to_animation
    }

    /// Animated value at `at`. `underlying` yields the value of the next
    /// lower animation in the sandwich, or the specified value; it is only
    /// called when [`Animation::needs_underlying`] holds.
    pub fn value_at<F>(&self, at: SimpleTime, underlying: F) -> SmilResult<AnimValue>
    where
        F: FnOnce() -> SmilResult<AnimValue>,
    {
        let p = match at.simple_dur {
            Time::Resolved(d) if d > 0 => (at.time as f64 / d as f64) as f32,
            _ => 0.0,
        };

        let mut si = 0;
        let mut begin = self.ref_times[0];
        let mut end = 1.0;
        for i in 1..self.ref_times.len() {
            if p < self.ref_times[i] {
                end = self.ref_times[i];
                break;
            }
            begin = self.ref_times[i];
            si = i;
        }
        let sp = if end == begin {
            1.0
        } else {
            ((p - begin) / (end - begin)).clamp(0.0, 1.0)
        };

        let mut sp = match self.calc_mode {
            CalcMode::Discrete => 0.0,
            CalcMode::Linear | CalcMode::Paced => sp,
            CalcMode::Spline => self.splines.get(si).map_or(sp, |s| s.eval(sp)),
        };

        if let Some(kp) = &self.key_points {
            let from = kp[si.min(kp.len() - 1)];
            let to = kp.get(si + 1).copied().unwrap_or(from);
            let dist = sp * to + (1.0 - sp) * from;
            (si, sp) = self.ref_values.segment_at_dist(dist);
        }

        if self.to_animation {
            if si == 0 {
                let mut seg = self
                    .ref_values
                    .segment(0)
                    .cloned()
                    .ok_or_else(|| SmilError::structure("to-animation without segments"))?;
                seg.set_start(&underlying()?)?;
                return Ok(seg.compute(sp));
            }
            return Ok(self.ref_values.compute(si, sp));
        }

        let mut v = self.ref_values.compute(si, sp);
        if self.accumulate && at.iteration > 0 {
            let last = match self.ref_values.last_value() {
                AnimValue::Matrix(m) if self.trait_kind == TraitKind::Motion => {
                    AnimValue::Matrix(Matrix::translate(m.0[4], m.0[5]))
                }
                other => other,
            };
            v = last.multiply(at.iteration)?.sum(&v)?;
        }
        if self.additive {
            v = underlying()?.sum(&v)?;
        }
        Ok(v)
    }
}

fn check_target(kind: AnimationKind, target: TargetTrait) -> SmilResult<()> {
    let ok = match kind {
        AnimationKind::Set => true,
        AnimationKind::Animate => matches!(target.kind, TraitKind::Float | TraitKind::Text),
        AnimationKind::AnimateColor => {
            target.kind == TraitKind::Float && target.syntax == ValueSyntax::Color
        }
        AnimationKind::AnimateTransform { .. } => target.kind == TraitKind::Transform,
        AnimationKind::AnimateMotion => target.kind == TraitKind::Motion,
    };
    if ok {
        Ok(())
    } else {
        Err(SmilError::validation(format!(
            "{kind:?} cannot target a {:?} trait",
            target.kind
        )))
    }
}

struct Selected {
    ref_values: RefValues,
    additive: bool,
    to_animation: bool,
}

/// Picks the value source in precedence order: `path`, `values`,
/// `from`+`to`, `from`+`by`, `by`, `to`.
fn select_values(def: &AnimationDef, target: TargetTrait) -> SmilResult<Option<Selected>> {
    let parse = |s: &str| parse_key(def.kind, target, s);
    let done = |segments: Vec<Segment>, additive: bool, to_animation: bool| {
        Ok(Some(Selected {
            ref_values: RefValues::new(segments)?,
            additive,
            to_animation,
        }))
    };

    if def.kind == AnimationKind::Set {
        let Some(to) = &def.to else {
            return Ok(None);
        };
        let k = parse(to)?;
        return done(key_segments(&[k], def.rotate)?, false, false);
    }

    if def.kind == AnimationKind::AnimateMotion
        && let Some(d) = &def.path
    {
        let path = BezPath::from_svg(d)
            .map_err(|e| SmilError::validation(format!("invalid motion path '{d}': {e}")))?;
        return done(segments_from_path(&path, def.rotate)?, def.additive, false);
    }

    if let Some(values) = &def.values {
        let keys = values
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse)
            .collect::<SmilResult<Vec<_>>>()?;
        if keys.is_empty() {
            return Err(SmilError::validation("'values' is empty"));
        }
        return done(key_segments(&keys, def.rotate)?, def.additive, false);
    }

    if let Some(from) = &def.from {
        let from = parse(from)?;
        if let Some(to) = &def.to {
            let to = parse(to)?;
            return done(key_segments(&[from, to], def.rotate)?, def.additive, false);
        }
        if let Some(by) = &def.by {
            let to = from.add(&parse(by)?)?;
            return done(key_segments(&[from, to], def.rotate)?, def.additive, false);
        }
        return Err(SmilError::validation("'from' needs a 'to' or 'by' value"));
    }

    if let Some(by) = &def.by {
        let by = parse(by)?;
        let zero = by.zero_like()?;
        return done(key_segments(&[zero, by], def.rotate)?, true, false);
    }

    if let Some(to) = &def.to {
        let to = parse(to)?;
        // the start is replaced by the underlying value at sample time
        let placeholder = to.clone();
        return done(key_segments(&[placeholder, to], def.rotate)?, false, true);
    }

    Ok(None)
}

fn parse_key(kind: AnimationKind, target: TargetTrait, s: &str) -> SmilResult<Key> {
    match (kind, target.kind) {
        (AnimationKind::AnimateTransform { transform }, _) => {
            Ok(Key::Params(transform, transform.normalize(&parse_numbers(s)?)?))
        }
        (_, TraitKind::Motion) => match parse_numbers(s)?.as_slice() {
            [x, y] => Ok(Key::Point(Point::new(f64::from(*x), f64::from(*y)))),
            _ => Err(SmilError::validation(format!(
                "motion value '{s}' must be an x,y pair"
            ))),
        },
        (_, TraitKind::Transform) => Err(SmilError::validation(
            "transform traits are animated with animateTransform",
        )),
        _ => match parse_value(target.syntax, s)? {
            AnimValue::Floats(v) => Ok(Key::Floats(v)),
            AnimValue::Text(t) => Ok(Key::Text(t)),
            AnimValue::Matrix(_) => Err(SmilError::structure("unexpected matrix key value")),
        },
    }
}

fn key_segments(keys: &[Key], rotate: MotionRotate) -> SmilResult<Vec<Segment>> {
    if let Some(Key::Point(_)) = keys.first() {
        let points = keys
            .iter()
            .map(|k| match k {
                Key::Point(p) => Ok(*p),
                _ => Err(SmilError::validation("mixed motion values")),
            })
            .collect::<SmilResult<Vec<_>>>()?;
        return segments_from_points(&points, rotate);
    }
    let pairs: Vec<(&Key, &Key)> = match keys {
        [] => return Err(SmilError::validation("no key values")),
        [k] => vec![(k, k)],
        _ => keys.windows(2).map(|w| (&w[0], &w[1])).collect(),
    };
    pairs
        .into_iter()
        .map(|(a, b)| leaf(a, b).map(Segment::from))
        .collect()
}

fn leaf(a: &Key, b: &Key) -> SmilResult<LeafSegment> {
    match (a, b) {
        (Key::Floats(s), Key::Floats(e)) => LeafSegment::float(s.clone(), e.clone()),
        (Key::Params(kind, s), Key::Params(_, e)) => Ok(LeafSegment::Transform {
            kind: *kind,
            start: *s,
            end: *e,
        }),
        (Key::Text(s), Key::Text(e)) => Ok(LeafSegment::Text {
            start: s.clone(),
            end: e.clone(),
        }),
        _ => Err(SmilError::validation("key values of different types")),
    }
}

fn ref_times(
    def: &AnimationDef,
    calc_mode: CalcMode,
    ref_values: &RefValues,
    key_points: Option<&[f32]>,
) -> SmilResult<Vec<f32>> {
    let n = ref_values.segment_count();
    let discrete = calc_mode == CalcMode::Discrete;

    if calc_mode == CalcMode::Paced {
        let mut times = Vec::with_capacity(n);
        times.push(0.0);
        times.extend_from_slice(&ref_values.normalized_lengths()[..n - 1]);
        return Ok(times);
    }

    if let Some(kp) = key_points {
        if kp.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(SmilError::validation("keyPoints must lie in [0, 1]"));
        }
        let kt = def
            .key_times
            .as_ref()
            .ok_or_else(|| SmilError::validation("keyPoints require keyTimes"))?;
        if kt.len() != kp.len() {
            return Err(SmilError::validation(format!(
                "{} keyPoints but {} keyTimes",
                kp.len(),
                kt.len()
            )));
        }
        return trimmed_key_times(kt, discrete);
    }

    if let Some(kt) = &def.key_times {
        // a discrete animation has one segment per key value
        let expected = if discrete { n } else { n + 1 };
        if kt.len() != expected {
            return Err(SmilError::validation(format!(
                "expected {expected} keyTimes, got {}",
                kt.len()
            )));
        }
        return trimmed_key_times(kt, discrete);
    }

    Ok((0..n).map(|i| i as f32 / n as f32).collect())
}

fn trimmed_key_times(kt: &[f32], discrete: bool) -> SmilResult<Vec<f32>> {
    let Some(&first) = kt.first() else {
        return Err(SmilError::validation("keyTimes is empty"));
    };
    if first != 0.0 {
        return Err(SmilError::validation("keyTimes must start at 0"));
    }
    if kt.windows(2).any(|w| w[1] < w[0]) || kt.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(SmilError::validation(
            "keyTimes must be ascending values in [0, 1]",
        ));
    }
    if discrete {
        return Ok(kt.to_vec());
    }
    if kt.last() != Some(&1.0) {
        return Err(SmilError::validation("keyTimes must end at 1"));
    }
    if kt.len() < 2 {
        return Err(SmilError::validation("keyTimes need at least two entries"));
    }
    Ok(kt[..kt.len() - 1].to_vec())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/animate.rs"]
mod tests;
