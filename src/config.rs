//! Analysis configuration.
//!
//! Everything here is a tuning value or a tie-break: none of it changes what
//! the scanner recognizes. The configuration is TOML on disk (`analysis.toml`)
//! and every field has a default, so a partial file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Which declaration wins when a name is declared twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    FirstWins,
    LastWins,
}

/// Bounds on route enumeration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteLimits {
    /// Routes emitted before enumeration stops.
    pub max_routes: usize,
    /// Traversal steps (link expansions) before enumeration stops.
    pub max_steps: usize,
    /// Display colors, cycled by route id.
    pub palette: Vec<String>,
}

pub const DEFAULT_ROUTE_PALETTE: [&str; 12] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#bfef45",
    "#469990", "#9a6324", "#800000", "#000075",
];

impl Default for RouteLimits {
    fn default() -> Self {
        Self {
            max_routes: 256,
            max_steps: 100_000,
            palette: DEFAULT_ROUTE_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Layout spacing and node metrics, in canvas units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin: (f32, f32),
    pub column_gap: f32,
    pub row_gap: f32,
    pub group_gap: f32,
    pub group_padding: f32,
    pub min_node_width: f32,
    pub max_node_width: f32,
    pub char_width: f32,
    pub header_height: f32,
    pub line_height: f32,
    pub max_preview_lines: usize,
    /// Overlaps smaller than this are ignored.
    pub overlap_tolerance: f32,
    pub max_overlap_passes: usize,
}

impl LayoutConfig {
    /// Every metric must be a finite number.
    pub fn validate(&self) -> AnalysisResult<()> {
        let metrics = [
            ("origin.x", self.origin.0),
            ("origin.y", self.origin.1),
            ("column_gap", self.column_gap),
            ("row_gap", self.row_gap),
            ("group_gap", self.group_gap),
            ("group_padding", self.group_padding),
            ("min_node_width", self.min_node_width),
            ("max_node_width", self.max_node_width),
            ("char_width", self.char_width),
            ("header_height", self.header_height),
            ("line_height", self.line_height),
            ("overlap_tolerance", self.overlap_tolerance),
        ];
        match metrics.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, value)) => Err(AnalysisError::InvalidConfig(format!(
                "layout.{name} must be finite, got {value}"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin: (40.0, 40.0),
            column_gap: 60.0,
            row_gap: 80.0,
            group_gap: 160.0,
            group_padding: 20.0,
            min_node_width: 160.0,
            max_node_width: 420.0,
            char_width: 8.0,
            header_height: 32.0,
            line_height: 18.0,
            max_preview_lines: 6,
            overlap_tolerance: 0.5,
            max_overlap_passes: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Entry labels for route enumeration. Empty means "every label with
    /// in-degree zero".
    pub entry_labels: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub report_unreachable: bool,
    pub routes: RouteLimits,
    pub layout: LayoutConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_labels: Vec::new(),
            duplicate_policy: DuplicatePolicy::FirstWins,
            report_unreachable: true,
            routes: RouteLimits::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a configuration and rejects non-finite layout metrics.
    pub fn from_toml(input: &str) -> AnalysisResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> AnalysisResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Saves the configuration to a file.
    pub fn save(&self, path: &Path) -> AnalysisResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Color for a route id; the palette is cycled.
    pub fn route_color(&self, route_id: u32) -> String {
        let palette = &self.routes.palette;
        if palette.is_empty() {
            return DEFAULT_ROUTE_PALETTE[route_id as usize % DEFAULT_ROUTE_PALETTE.len()]
                .to_string();
        }
        palette[route_id as usize % palette.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AnalysisConfig::from_toml(
            r#"
            entry_labels = ["start"]

            [routes]
            max_routes = 10
            "#,
        )
        .expect("parse config");

        assert_eq!(config.entry_labels, vec!["start".to_string()]);
        assert_eq!(config.routes.max_routes, 10);
        assert_eq!(config.routes.max_steps, 100_000);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_duplicate_policy_snake_case() {
        let config = AnalysisConfig::from_toml("duplicate_policy = \"last_wins\"").expect("parse");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AnalysisConfig::default();
        config.layout.row_gap = 12.0;
        let text = config.to_toml().expect("serialize");
        let loaded = AnalysisConfig::from_toml(&text).expect("deserialize");
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_route_color_cycles() {
        let mut config = AnalysisConfig::default();
        config.routes.palette = vec!["#111111".into(), "#222222".into()];
        assert_eq!(config.route_color(0), "#111111");
        assert_eq!(config.route_color(3), "#222222");

        config.routes.palette.clear();
        assert_eq!(config.route_color(0), DEFAULT_ROUTE_PALETTE[0]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AnalysisConfig::from_toml("routes = 5").unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Config(_)));
    }
}
