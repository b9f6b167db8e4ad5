use crate::{
    foundation::{
        core::Viewport,
        error::{SmilError, SmilResult},
    },
    render::tile::Tile,
};

pub const DEFAULT_TILE_MIN_SIZE: u32 = 40;

/// Fixed quadtree over the viewport. Leaves are at least `tile_min_size`
/// on each side; a quadrant whose four children are all hit is reported as
/// one tile.
#[derive(Clone, Debug)]
struct QuadNode {
    tile: Tile,
    hit: bool,
    parent: Option<usize>,
    children: Option<[usize; 4]>,
}

#[derive(Clone, Debug)]
struct TileTree {
    nodes: Vec<QuadNode>,
}

impl TileTree {
    fn build(vp: Viewport, min: u32) -> Self {
        let mut tree = TileTree { nodes: Vec::new() };
        let (w, h) = (vp.width as i32, vp.height as i32);
        let min = min as i32;
        tree.push(None, Tile::new(0, 0, w, h));
        if w >= 2 * min && h >= 2 * min {
            tree.split(0, min);
        }
        tree
    }

    fn push(&mut self, parent: Option<usize>, tile: Tile) -> usize {
        self.nodes.push(QuadNode {
            tile,
            hit: false,
            parent,
            children: None,
        });
        self.nodes.len() - 1
    }

    fn split(&mut self, idx: usize, min: i32) {
        let t = self.nodes[idx].tile;
        let (w, h) = (t.width(), t.height());
        let (cw, ch) = (w / 2, h / 2);
        let quads = [
            Tile::new(t.x, t.y, cw, ch),
            Tile::new(t.x + cw, t.y, w - cw, ch),
            Tile::new(t.x, t.y + ch, cw, h - ch),
            Tile::new(t.x + cw, t.y + ch, w - cw, h - ch),
        ];
        let children = quads.map(|q| self.push(Some(idx), q));
        self.nodes[idx].children = Some(children);
        if w / 4 >= min && h / 4 >= min {
            for c in children {
                self.split(c, min);
            }
        }
    }

    fn clear(&mut self) {
        for n in &mut self.nodes {
            n.hit = false;
        }
    }

    fn root_hit(&self) -> bool {
        self.nodes[0].hit
    }

    fn check_hit(&mut self, idx: usize, t: &Tile) {
        if self.nodes[idx].hit || !self.nodes[idx].tile.intersects(t) {
            return;
        }
        match self.nodes[idx].children {
            Some(children) => {
                for c in children {
                    self.check_hit(c, t);
                }
            }
            None => self.mark_hit(idx),
        }
    }

    fn mark_hit(&mut self, idx: usize) {
        self.nodes[idx].hit = true;
        let Some(parent) = self.nodes[idx].parent else {
            return;
        };
        let all = self.nodes[parent]
            .children
            .is_some_and(|cs| cs.iter().all(|c| self.nodes[*c].hit));
        if all && !self.nodes[parent].hit {
            self.mark_hit(parent);
        }
    }

    fn hit_tiles(&self, idx: usize, out: &mut Vec<Tile>) {
        let n = &self.nodes[idx];
        if n.hit {
            out.push(n.tile);
            return;
        }
        if let Some(children) = n.children {
            for c in children {
                self.hit_tiles(c, out);
            }
        }
    }
}

/// Result of one dirty-area pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirtyRegion {
    /// Nothing to repaint.
    Clean,
    /// Repaint the whole viewport.
    Full(Tile),
    /// Repaint only these disjoint tiles.
    Tiles(Vec<Tile>),
}

impl DirtyRegion {
    pub fn tiles(&self) -> Vec<Tile> {
        match self {
            DirtyRegion::Clean => Vec::new(),
            DirtyRegion::Full(t) => vec![*t],
            DirtyRegion::Tiles(ts) => ts.clone(),
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, DirtyRegion::Clean)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, DirtyRegion::Full(_))
    }
}

/// Accumulates the old and new device tiles of every node touched since the
/// last repaint and reduces them to a set of quadtree tiles.
///
/// The first pass after a viewport or tile size change, and any pass after
/// [`DirtyAreaManager::invalidate`], repaints everything.
#[derive(Clone, Debug)]
pub struct DirtyAreaManager {
    viewport: Viewport,
    tile_min_size: u32,
    tree: Option<TileTree>,
    pending: Vec<Tile>,
    full: bool,
}

impl DirtyAreaManager {
    pub fn new(viewport: Viewport, tile_min_size: u32) -> SmilResult<Self> {
        if tile_min_size == 0 {
            return Err(SmilError::validation("tile_min_size must be at least 1"));
        }
        Ok(Self {
            viewport,
            tile_min_size,
            tree: None,
            pending: Vec::new(),
            full: true,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn tile_min_size(&self) -> u32 {
        self.tile_min_size
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.tree = None;
            self.full = true;
        }
    }

    pub fn set_tile_min_size(&mut self, tile_min_size: u32) -> SmilResult<()> {
        if tile_min_size == 0 {
            return Err(SmilError::validation("tile_min_size must be at least 1"));
        }
        self.tile_min_size = tile_min_size;
        self.tree = None;
        self.full = true;
        Ok(())
    }

    /// Records a device area that must be repainted.
    pub fn add(&mut self, tile: Tile) {
        if !tile.is_empty() {
            self.pending.push(tile);
        }
    }

    /// Forces the next pass to repaint the whole viewport.
    pub fn invalidate(&mut self) {
        self.full = true;
    }

    pub fn has_pending(&self) -> bool {
        self.full || !self.pending.is_empty()
    }

    /// Reduces pending areas to repaint tiles and resets the accumulator.
    pub fn take_dirty_region(&mut self) -> DirtyRegion {
        let root = Tile::viewport(self.viewport);
        let tree = match self.tree.take() {
            Some(t) => t,
            None => {
                self.full = true;
                TileTree::build(self.viewport, self.tile_min_size)
            }
        };
        let mut tree = tree;
        let region = if self.full {
            DirtyRegion::Full(root)
        } else if self.pending.is_empty() {
            DirtyRegion::Clean
        } else {
            tree.clear();
            for t in &self.pending {
                if tree.root_hit() {
                    break;
                }
                tree.check_hit(0, t);
            }
            if tree.root_hit() {
                DirtyRegion::Full(root)
            } else {
                let mut out = Vec::new();
                tree.hit_tiles(0, &mut out);
                if out.is_empty() {
                    DirtyRegion::Clean
                } else {
                    DirtyRegion::Tiles(out)
                }
            }
        };
        self.tree = Some(tree);
        self.pending.clear();
        self.full = false;
        region
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/dirty.rs"]
mod tests;
