use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::Context;

use crate::{
    foundation::{
        core::Rgba8,
        error::{SmilError, SmilResult},
    },
    render::dirty::DEFAULT_TILE_MIN_SIZE,
};

/// Player settings, loadable from JSON.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Period of the sample task.
    pub frame_interval_ms: u64,
    /// Smallest dirty tile edge before neighbouring tiles are merged.
    pub tile_min_size: u32,
    /// `false` repaints the whole canvas on every change.
    pub dirty_areas: bool,
    /// Background painted under the scene, straight RGBA.
    pub clear_rgba: [u8; 4],
    /// Fixed document-time step per tick. `None` follows the wall clock.
    pub time_increment_ms: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 40,
            tile_min_size: DEFAULT_TILE_MIN_SIZE,
            dirty_areas: true,
            clear_rgba: [255, 255, 255, 255],
            time_increment_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> SmilResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(SmilError::validation("frame_interval_ms must be > 0"));
        }
        if self.tile_min_size == 0 {
            return Err(SmilError::validation("tile_min_size must be > 0"));
        }
        if let Some(step) = self.time_increment_ms
            && step <= 0
        {
            return Err(SmilError::validation(format!(
                "time_increment_ms must be > 0, got {step}"
            )));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn clear_color(&self) -> Rgba8 {
        let [r, g, b, a] = self.clear_rgba;
        Rgba8 { r, g, b, a }
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> SmilResult<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SmilResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/runtime/config.rs"]
mod tests;
