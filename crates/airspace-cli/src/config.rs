//! CLI configuration from environment and an optional rules file.

use airspace_core::AirspaceRules;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Config {
    pub rules: AirspaceRules,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(AirspaceRules::default(), |key| env::var(key).ok())
    }

    /// Rules file (or defaults), overridden by environment.
    pub fn load(rules_path: Option<&Path>) -> Result<Self> {
        let Some(path) = rules_path else {
            return Ok(Self::from_env());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading rules file {}", path.display()))?;
        let rules: AirspaceRules = serde_json::from_str(&text)
            .with_context(|| format!("parsing rules file {}", path.display()))?;
        Ok(Self::from_lookup(rules, |key| env::var(key).ok()))
    }

    fn from_lookup(mut rules: AirspaceRules, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(buffer) = lookup("AIRSPACE_BUFFER_M")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|b| b.is_finite() && *b >= 0.0)
        {
            rules.default_buffer_m = buffer;
        }
        if let Some(steps) = lookup("AIRSPACE_BUFFER_STEPS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|s| *s > 0)
        {
            rules.buffer_steps = steps;
        }
        let log_json = lookup("AIRSPACE_LOG_JSON")
            .map(|s| matches!(s.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        Self { rules, log_json }
    }
}
