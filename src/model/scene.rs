use std::collections::{BTreeMap, HashMap};

use kurbo::{Circle, Ellipse, Shape};

use crate::{
    animation::value::AnimValue,
    foundation::{
        core::{Affine, BezPath, NodeId, Point, Rect, Rgba8, Viewport},
        error::{SmilError, SmilResult},
        math::Matrix,
    },
    model::traits::TraitId,
    render::{dirty::DirtyAreaManager, manager::RenderingManager, tile::Tile},
};

const PATH_TOLERANCE: f64 = 0.1;

/// Element kind of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Svg,
    Group,
    Rect,
    Circle,
    Ellipse,
    Line,
    Polygon,
    Image,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Svg | NodeKind::Group)
    }

    /// `true` for kinds that paint something themselves.
    pub fn has_rendering(self) -> bool {
        !self.is_container()
    }

    pub fn supports(self, t: TraitId) -> bool {
        use TraitId as T;
        match t {
            T::Fill | T::FillOpacity | T::Stroke | T::StrokeWidth | T::Opacity | T::Display
            | T::Visibility => true,
            T::Transform | T::Motion => self != NodeKind::Svg,
            T::X | T::Y | T::Width | T::Height => {
                matches!(self, NodeKind::Rect | NodeKind::Image)
            }
            T::Rx | T::Ry => matches!(self, NodeKind::Rect | NodeKind::Ellipse),
            T::Cx | T::Cy => matches!(self, NodeKind::Circle | NodeKind::Ellipse),
            T::R => self == NodeKind::Circle,
            T::X1 | T::Y1 | T::X2 | T::Y2 => self == NodeKind::Line,
            T::Points => self == NodeKind::Polygon,
            T::Href => self == NodeKind::Image,
        }
    }
}

/// Reasons a node cannot currently render. Empty means it renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderState(u8);

impl RenderState {
    pub const DISPLAY_NONE: RenderState = RenderState(1);
    pub const HIDDEN: RenderState = RenderState(1 << 1);
    pub const ZERO_SIZE: RenderState = RenderState(1 << 2);
    /// Some transform on the path to the root cannot be inverted: no bbox, no
    /// hit testing, nothing painted.
    pub const NON_INVERTIBLE: RenderState = RenderState(1 << 3);

    pub fn contains(self, other: RenderState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RenderState) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    element_id: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
    traits: BTreeMap<TraitId, AnimValue>,
    rendering: RenderingManager,
}

/// Arena-backed scene tree with typed trait storage and repaint tracking.
///
/// All trait writes, from scripts and from animations alike, go through
/// [`SceneModel::set_trait`], which validates the value, marks the affected
/// nodes for repaint and raises the repaint flag.
#[derive(Clone, Debug)]
pub struct SceneModel {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
    viewport: Viewport,
    view_box: Option<Rect>,
    dirty_nodes: Vec<NodeId>,
    removed_tiles: Vec<Tile>,
    structure_changed: bool,
    needs_repaint: bool,
}

impl SceneModel {
    pub fn new(viewport: Viewport) -> Self {
        let root = Node {
            kind: NodeKind::Svg,
            element_id: None,
            parent: None,
            children: Vec::new(),
            attached: true,
            traits: BTreeMap::new(),
            rendering: RenderingManager::new(),
        };
        Self {
            nodes: vec![root],
            ids: HashMap::new(),
            viewport,
            view_box: None,
            dirty_nodes: Vec::new(),
            removed_tiles: Vec::new(),
            structure_changed: true,
            needs_repaint: true,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.structure_changed = true;
            self.needs_repaint = true;
        }
    }

    /// User-space rectangle mapped onto the viewport (uniform scale, centered).
    pub fn set_view_box(&mut self, view_box: Option<Rect>) -> SmilResult<()> {
        if let Some(vb) = view_box
            && (vb.width() <= 0.0 || vb.height() <= 0.0)
        {
            return Err(SmilError::validation("viewBox must have a positive size"));
        }
        self.view_box = view_box;
        self.structure_changed = true;
        self.needs_repaint = true;
        Ok(())
    }

    fn node(&self, id: NodeId) -> SmilResult<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| SmilError::structure(format!("unknown node {id:?}")))
    }

    fn node_mut(&mut self, id: NodeId) -> SmilResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| SmilError::structure(format!("unknown node {id:?}")))
    }

    pub fn kind(&self, id: NodeId) -> SmilResult<NodeKind> {
        Ok(self.node(id)?.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup(&self, element_id: &str) -> Option<NodeId> {
        self.ids.get(element_id).copied()
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).and_then(|n| n.element_id.as_deref())
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.attached)
    }

    /// Appends a new node under `parent`.
    pub fn insert(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        element_id: Option<&str>,
    ) -> SmilResult<NodeId> {
        let p = self.node(parent)?;
        if !p.kind.is_container() || !p.attached {
            return Err(SmilError::structure(format!(
                "{parent:?} cannot take children"
            )));
        }
        if kind == NodeKind::Svg {
            return Err(SmilError::structure("nested svg roots are not supported"));
        }
        if let Some(eid) = element_id
            && self.ids.contains_key(eid)
        {
            return Err(SmilError::structure(format!("duplicate element id '{eid}'")));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            element_id: element_id.map(str::to_owned),
            parent: Some(parent),
            children: Vec::new(),
            attached: true,
            traits: BTreeMap::new(),
            rendering: RenderingManager::new(),
        });
        self.node_mut(parent)?.children.push(id);
        if let Some(eid) = element_id {
            self.ids.insert(eid.to_owned(), id);
        }
        self.mark_rendering_dirty(id);
        self.structure_changed = true;
        self.needs_repaint = true;
        tracing::debug!(?id, ?kind, "node inserted");
        Ok(id)
    }

    /// Detaches `id` and its subtree. Their last painted areas are queued for
    /// repaint.
    pub fn remove(&mut self, id: NodeId) -> SmilResult<()> {
        if id == self.root() {
            return Err(SmilError::structure("the root node cannot be removed"));
        }
        let parent = self
            .node(id)?
            .parent
            .ok_or_else(|| SmilError::structure(format!("{id:?} is already detached")))?;
        self.node_mut(parent)?.children.retain(|c| *c != id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let (tile, eid, children) = {
                let node = self.node_mut(n)?;
                node.attached = false;
                (
                    node.rendering.take_last_rendered_tile(),
                    node.element_id.take(),
                    node.children.clone(),
                )
            };
            if let Some(t) = tile {
                self.removed_tiles.push(t);
            }
            if let Some(eid) = eid {
                self.ids.remove(&eid);
            }
            stack.extend(children);
        }
        self.node_mut(id)?.parent = None;
        self.structure_changed = true;
        self.needs_repaint = true;
        Ok(())
    }

    /// The node's own value for `t`, or the trait's initial value.
    pub fn get_trait(&self, id: NodeId, t: TraitId) -> SmilResult<AnimValue> {
        let node = self.node(id)?;
        if !node.kind.supports(t) {
            return Err(SmilError::structure(format!(
                "{:?} has no trait '{t}'",
                node.kind
            )));
        }
        Ok(node.traits.get(&t).cloned().unwrap_or_else(|| t.initial_value()))
    }

    pub fn has_trait_value(&self, id: NodeId, t: TraitId) -> bool {
        self.nodes
            .get(id.index())
            .is_some_and(|n| n.traits.contains_key(&t))
    }

    /// Explicitly set traits of `id`, in trait order.
    pub fn traits(&self, id: NodeId) -> impl Iterator<Item = (TraitId, &AnimValue)> {
        self.nodes
            .get(id.index())
            .into_iter()
            .flat_map(|n| n.traits.iter().map(|(t, v)| (*t, v)))
    }

    /// Validated trait write. Returns `false` when the value did not change.
    pub fn set_trait(&mut self, id: NodeId, t: TraitId, value: AnimValue) -> SmilResult<bool> {
        let kind = self.node(id)?.kind;
        if !kind.supports(t) {
            return Err(SmilError::structure(format!("{kind:?} has no trait '{t}'")));
        }
        t.validate(&value)?;
        let node = self.node_mut(id)?;
        if node.traits.get(&t) == Some(&value) {
            return Ok(false);
        }
        node.traits.insert(t, value);
        if !node.attached {
            return Ok(true);
        }
        if kind.is_container() {
            self.mark_subtree_dirty(id);
        } else {
            self.mark_rendering_dirty(id);
        }
        self.needs_repaint = true;
        Ok(true)
    }

    pub fn set_trait_str(&mut self, id: NodeId, t: TraitId, value: &str) -> SmilResult<bool> {
        let parsed = t.parse(value)?;
        self.set_trait(id, t, parsed)
    }

    /// Queues `id` for repaint without changing any trait, e.g. when an
    /// image it references finished loading.
    pub fn touch(&mut self, id: NodeId) -> SmilResult<()> {
        if !self.node(id)?.attached {
            return Ok(());
        }
        self.mark_rendering_dirty(id);
        self.needs_repaint = true;
        Ok(())
    }

    /// Attached image nodes that reference `href`.
    pub fn nodes_with_href(&self, href: &str) -> Vec<NodeId> {
        self.paint_order()
            .into_iter()
            .filter(|id| self.href(*id).as_deref() == Some(href))
            .collect()
    }

    fn mark_rendering_dirty(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index())
            && node.kind.has_rendering()
            && node.rendering.mark_dirty()
        {
            self.dirty_nodes.push(id);
        }
    }

    fn mark_subtree_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            self.mark_rendering_dirty(n);
            stack.extend(self.children(n).iter().copied());
        }
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    pub fn set_needs_repaint(&mut self, value: bool) {
        self.needs_repaint = value;
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.rendering.is_dirty())
    }

    pub fn last_rendered_tile(&self, id: NodeId) -> Option<Tile> {
        self.nodes
            .get(id.index())
            .and_then(|n| n.rendering.last_rendered_tile())
    }

    /// Moves everything touched since the last pass into `dam`: the old tile
    /// and the fresh tile of each dirty node, and the tiles of removed nodes.
    /// Structural changes force a full repaint.
    pub fn collect_dirty_areas(&mut self, dam: &mut DirtyAreaManager) {
        dam.set_viewport(self.viewport);
        if std::mem::take(&mut self.structure_changed) {
            dam.invalidate();
        }
        for t in self.removed_tiles.drain(..) {
            dam.add(t);
        }
        let dirty = std::mem::take(&mut self.dirty_nodes);
        for id in dirty {
            let fresh = if self.is_attached(id) {
                self.rendering_tile(id)
            } else {
                None
            };
            let Some(node) = self.nodes.get_mut(id.index()) else {
                continue;
            };
            if let Some(old) = node.rendering.take_last_rendered_tile() {
                dam.add(old);
            }
            if let Some(t) = fresh {
                dam.add(t);
            }
            node.rendering.rendered(None);
        }
    }

    /// Records the tile a node was just painted into.
    pub(crate) fn record_rendered(&mut self, id: NodeId, tile: Option<Tile>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.rendering.rendered(tile);
        }
    }

    /// Attached nodes in paint order (pre-order, document order).
    pub fn paint_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    fn root_transform(&self) -> Affine {
        let Some(vb) = self.view_box else {
            return Affine::IDENTITY;
        };
        let vp = self.viewport.bounds();
        let s = (vp.width() / vb.width()).min(vp.height() / vb.height());
        let tx = (vp.width() - vb.width() * s) / 2.0 - vb.x0 * s;
        let ty = (vp.height() - vb.height() * s) / 2.0 - vb.y0 * s;
        Affine::new([s, 0.0, 0.0, s, tx, ty])
    }

    fn matrix_trait(&self, id: NodeId, t: TraitId) -> Matrix {
        self.nodes
            .get(id.index())
            .and_then(|n| n.traits.get(&t))
            .and_then(AnimValue::as_matrix)
            .unwrap_or(Matrix::IDENTITY)
    }

    /// Own transform of `id`: the motion transform applied after `transform`.
    pub fn local_matrix(&self, id: NodeId) -> Matrix {
        self.matrix_trait(id, TraitId::Motion)
            .concat(&self.matrix_trait(id, TraitId::Transform))
    }

    fn ancestors_and_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            chain.push(p);
            cur = p;
        }
        chain.reverse();
        chain
    }

    /// User space to device space for `id`.
    pub fn device_transform(&self, id: NodeId) -> Affine {
        self.ancestors_and_self(id)
            .into_iter()
            .fold(self.root_transform(), |acc, n| {
                acc * self.local_matrix(n).to_affine()
            })
    }

    fn number(&self, id: NodeId, t: TraitId) -> f64 {
        self.nodes
            .get(id.index())
            .and_then(|n| n.traits.get(&t))
            .and_then(AnimValue::as_number)
            .map_or(0.0, f64::from)
    }

    /// Walks up the tree for inherited presentation traits.
    fn inherited(&self, id: NodeId, t: TraitId) -> AnimValue {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if let Some(v) = self.nodes.get(n.index()).and_then(|node| node.traits.get(&t)) {
                return v.clone();
            }
            cur = self.parent(n);
        }
        t.initial_value()
    }

    /// Product of `opacity` along the ancestor chain.
    pub fn group_opacity(&self, id: NodeId) -> f32 {
        self.ancestors_and_self(id)
            .into_iter()
            .map(|n| {
                if self.has_trait_value(n, TraitId::Opacity) {
                    self.number(n, TraitId::Opacity) as f32
                } else {
                    1.0
                }
            })
            .product::<f32>()
            .clamp(0.0, 1.0)
    }

    fn paint(&self, id: NodeId, color: TraitId, opacity: Option<TraitId>) -> Option<Rgba8> {
        let v = self.inherited(id, color);
        let rgb = v.as_floats()?;
        let alpha = opacity
            .and_then(|o| self.inherited(id, o).as_number())
            .unwrap_or(1.0)
            * self.group_opacity(id);
        Some(Rgba8::from_components(rgb).with_opacity(alpha))
    }

    /// Effective fill, `None` for `fill="none"`.
    pub fn fill_color(&self, id: NodeId) -> Option<Rgba8> {
        self.paint(id, TraitId::Fill, Some(TraitId::FillOpacity))
    }

    /// Effective stroke and stroke width, `None` when not stroked.
    pub fn stroke(&self, id: NodeId) -> Option<(Rgba8, f64)> {
        let width = self
            .inherited(id, TraitId::StrokeWidth)
            .as_number()
            .map_or(1.0, f64::from);
        if width <= 0.0 {
            return None;
        }
        self.paint(id, TraitId::Stroke, None).map(|c| (c, width))
    }

    /// Image placement rectangle in user space.
    pub fn image_rect(&self, id: NodeId) -> Rect {
        let x = self.number(id, TraitId::X);
        let y = self.number(id, TraitId::Y);
        Rect::new(
            x,
            y,
            x + self.number(id, TraitId::Width),
            y + self.number(id, TraitId::Height),
        )
    }

    pub fn href(&self, id: NodeId) -> Option<String> {
        self.nodes
            .get(id.index())
            .and_then(|n| n.traits.get(&TraitId::Href))
            .and_then(|v| v.as_text().map(str::to_owned))
            .filter(|s| !s.is_empty())
    }

    /// Outline of `id` in user space. `None` for containers.
    pub fn shape(&self, id: NodeId) -> Option<BezPath> {
        let kind = self.nodes.get(id.index())?.kind;
        let n = |t| self.number(id, t);
        let path = match kind {
            NodeKind::Svg | NodeKind::Group => return None,
            NodeKind::Rect => {
                let rect = Rect::new(
                    n(TraitId::X),
                    n(TraitId::Y),
                    n(TraitId::X) + n(TraitId::Width),
                    n(TraitId::Y) + n(TraitId::Height),
                );
                let radius = n(TraitId::Rx).max(n(TraitId::Ry));
                if radius > 0.0 {
                    rect.to_rounded_rect(radius).to_path(PATH_TOLERANCE)
                } else {
                    rect.to_path(PATH_TOLERANCE)
                }
            }
            NodeKind::Image => self.image_rect(id).to_path(PATH_TOLERANCE),
            NodeKind::Circle => Circle::new((n(TraitId::Cx), n(TraitId::Cy)), n(TraitId::R))
                .to_path(PATH_TOLERANCE),
            NodeKind::Ellipse => Ellipse::new(
                (n(TraitId::Cx), n(TraitId::Cy)),
                (n(TraitId::Rx), n(TraitId::Ry)),
                0.0,
            )
            .to_path(PATH_TOLERANCE),
            NodeKind::Line => {
                let mut p = BezPath::new();
                p.move_to((n(TraitId::X1), n(TraitId::Y1)));
                p.line_to((n(TraitId::X2), n(TraitId::Y2)));
                p
            }
            NodeKind::Polygon => {
                let pts = self
                    .nodes
                    .get(id.index())?
                    .traits
                    .get(&TraitId::Points)
                    .and_then(AnimValue::as_floats)
                    .unwrap_or(&[]);
                let mut p = BezPath::new();
                for (i, xy) in pts.chunks_exact(2).enumerate() {
                    let pt = Point::new(f64::from(xy[0]), f64::from(xy[1]));
                    if i == 0 {
                        p.move_to(pt);
                    } else {
                        p.line_to(pt);
                    }
                }
                if pts.len() >= 4 {
                    p.close_path();
                }
                p
            }
        };
        Some(path)
    }

    fn is_zero_size(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id.index()) else {
            return true;
        };
        let n = |t| self.number(id, t);
        match node.kind {
            NodeKind::Svg | NodeKind::Group => false,
            NodeKind::Rect | NodeKind::Image => n(TraitId::Width) <= 0.0 || n(TraitId::Height) <= 0.0,
            NodeKind::Circle => n(TraitId::R) <= 0.0,
            NodeKind::Ellipse => n(TraitId::Rx) <= 0.0 || n(TraitId::Ry) <= 0.0,
            NodeKind::Line => false,
            NodeKind::Polygon => node
                .traits
                .get(&TraitId::Points)
                .and_then(AnimValue::as_floats)
                .is_none_or(|v| v.len() < 4),
        }
    }

    /// Current render-state bits of `id`.
    pub fn render_state(&self, id: NodeId) -> RenderState {
        let mut state = RenderState::default();
        let chain = self.ancestors_and_self(id);
        for n in &chain {
            let display = self
                .nodes
                .get(n.index())
                .and_then(|node| node.traits.get(&TraitId::Display))
                .and_then(AnimValue::as_text);
            if display == Some("none") {
                state.insert(RenderState::DISPLAY_NONE);
            }
            if !self.local_matrix(*n).is_invertible() {
                state.insert(RenderState::NON_INVERTIBLE);
            }
        }
        if self.inherited(id, TraitId::Visibility).as_text() == Some("hidden") {
            state.insert(RenderState::HIDDEN);
        }
        if self.is_zero_size(id) {
            state.insert(RenderState::ZERO_SIZE);
        }
        state
    }

    /// `true` when `id` is attached, paints itself and has an empty render state.
    pub fn renders(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index())
            .is_some_and(|n| n.attached && n.kind.has_rendering())
            && self.render_state(id).is_empty()
    }

    /// Device-space bounds including the stroke. `None` when the node does not
    /// render, which includes a non-invertible transform.
    pub fn device_bbox(&self, id: NodeId) -> Option<Rect> {
        if !self.renders(id) {
            return None;
        }
        let shape = self.shape(id)?;
        let mut bounds = shape.bounding_box();
        if let Some((_, w)) = self.stroke(id) {
            bounds = bounds.inflate(w / 2.0, w / 2.0);
        }
        Some(self.device_transform(id).transform_rect_bbox(bounds))
    }

    /// Device tile the node would cover if painted now.
    pub fn rendering_tile(&self, id: NodeId) -> Option<Tile> {
        self.device_bbox(id).and_then(Tile::covering)
    }

    /// Topmost rendered node whose fill area contains the device point.
    pub fn hit_test(&self, point: Point) -> Option<NodeId> {
        self.paint_order().into_iter().rev().find(|id| {
            if !self.renders(*id) {
                return false;
            }
            let Some(shape) = self.shape(*id) else {
                return false;
            };
            let user = self.device_transform(*id).inverse() * point;
            shape.contains(user)
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/scene.rs"]
mod tests;
