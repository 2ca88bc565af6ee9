//! Engine configuration with environment overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::env::VarError;

use crate::consts::{
    DRAG_THRESHOLD, H_OFFSET, HISTORY_LIMIT, LAYOUT_EPSILON, MIN_NODE_WIDTH, NAV_CROSS_WEIGHT, TREE_PADDING, V_GAP,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

impl ConfigError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

/// Geometry rules used by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal step per depth level.
    pub h_offset: f64,
    /// Vertical gap between sibling bands.
    pub v_gap: f64,
    /// Clearance between root trees after overlap resolution.
    pub padding: f64,
    /// Deltas smaller than this are not applied.
    pub epsilon: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { h_offset: H_OFFSET, v_gap: V_GAP, padding: TREE_PADDING, epsilon: LAYOUT_EPSILON }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// Weight of cross-axis distance in the spatial navigation score.
    pub nav_cross_weight: f64,
    /// Minimum pointer travel (world units) for a drag update to count.
    pub drag_threshold: f64,
    /// Narrowest width a resize gesture may produce.
    pub min_node_width: f64,
    /// Undo levels kept before the oldest is dropped.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            nav_cross_weight: NAV_CROSS_WEIGHT,
            drag_threshold: DRAG_THRESHOLD,
            min_node_width: MIN_NODE_WIDTH,
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `MINDCANVAS_H_OFFSET`: default 200
    /// - `MINDCANVAS_V_GAP`: default 20
    /// - `MINDCANVAS_PADDING`: default 40
    /// - `MINDCANVAS_NAV_WEIGHT`: default 10
    /// - `MINDCANVAS_DRAG_THRESHOLD`: default 0.5
    /// - `MINDCANVAS_HISTORY_LIMIT`: default 200
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a variable is set but is not a
    /// positive number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for unparsable or non-positive values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let defaults = Self::default();
        let layout = LayoutConfig {
            h_offset: parse_f64(&lookup, "MINDCANVAS_H_OFFSET", defaults.layout.h_offset)?,
            v_gap: parse_f64(&lookup, "MINDCANVAS_V_GAP", defaults.layout.v_gap)?,
            padding: parse_f64(&lookup, "MINDCANVAS_PADDING", defaults.layout.padding)?,
            epsilon: defaults.layout.epsilon,
        };
        Ok(Self {
            layout,
            nav_cross_weight: parse_f64(&lookup, "MINDCANVAS_NAV_WEIGHT", defaults.nav_cross_weight)?,
            drag_threshold: parse_f64(&lookup, "MINDCANVAS_DRAG_THRESHOLD", defaults.drag_threshold)?,
            min_node_width: defaults.min_node_width,
            history_limit: parse_usize(&lookup, "MINDCANVAS_HISTORY_LIMIT", defaults.history_limit)?,
        })
    }
}

fn parse_f64<F>(lookup: &F, var: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let Ok(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ConfigError::Invalid { var: var.to_string(), value: raw }),
    }
}

fn parse_usize<F>(lookup: &F, var: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let Ok(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::Invalid { var: var.to_string(), value: raw }),
    }
}
