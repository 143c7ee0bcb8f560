//! Configuration Module
//!
//! Optional TOML file controlling which call marks the target and how the
//! diagram is drawn:
//!
//! ```toml
//! [marker]
//! path = "cyberbrain::register"
//!
//! [render]
//! graph_name = "Cyberbrain Output"
//! show_tracking = true
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::ast::MarkerConfig;
use crate::ports::flowchart_exporter::RenderConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub marker: MarkerConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
