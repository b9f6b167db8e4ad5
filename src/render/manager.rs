use crate::render::tile::Tile;

/// Per-node repaint bookkeeping: the tile covered by the node's last paint
/// and whether its rendering changed since.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderingManager {
    last_rendered: Option<Tile>,
    dirty: bool,
}

impl RenderingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` if the node was clean, so callers queue it only once.
    pub fn mark_dirty(&mut self) -> bool {
        !std::mem::replace(&mut self.dirty, true)
    }

    pub fn last_rendered_tile(&self) -> Option<Tile> {
        self.last_rendered
    }

    /// Records the tile of a paint that just happened, or clears it when the
    /// node no longer renders.
    pub fn rendered(&mut self, tile: Option<Tile>) {
        self.last_rendered = tile;
        self.dirty = false;
    }

    /// Drops the recorded tile and returns it.
    pub fn take_last_rendered_tile(&mut self) -> Option<Tile> {
        self.last_rendered.take()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/manager.rs"]
mod tests;
