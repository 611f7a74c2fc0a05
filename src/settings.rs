//! Client settings — everything the settings popup persists.
//!
//! Stored one row per key in the settings table so individual fields can be
//! written independently (the way the original key-value store worked).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DEFAULT_BASE_URL, DEFAULT_END_TAG, DEFAULT_START_TAG};

/// How sampling parameters are chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    Precise,
    Balanced,
    Creative,
    Custom,
}

impl ParameterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precise => "precise",
            Self::Balanced => "balanced",
            Self::Creative => "creative",
            Self::Custom => "custom",
        }
    }

    /// Preset temperature, if this mode is a preset.
    pub fn preset_temperature(&self) -> Option<f64> {
        match self {
            Self::Precise => Some(0.0),
            Self::Balanced => Some(0.5),
            Self::Creative => Some(1.0),
            Self::Custom => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub selected_model: String,
    pub system_content: String,
    /// Custom sampling parameters, passed through to the backend as-is.
    pub parameters: BTreeMap<String, Value>,
    pub start_tag: String,
    pub end_tag: String,
    pub parameter_mode: ParameterMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            selected_model: String::new(),
            system_content: String::new(),
            parameters: BTreeMap::new(),
            start_tag: DEFAULT_START_TAG.to_string(),
            end_tag: DEFAULT_END_TAG.to_string(),
            parameter_mode: ParameterMode::Balanced,
        }
    }
}

impl Settings {
    /// The parameter map a request should carry: the custom map in custom
    /// mode, otherwise the preset temperature.
    pub fn effective_parameters(&self) -> BTreeMap<String, Value> {
        match self.parameter_mode.preset_temperature() {
            Some(t) => {
                let mut map = BTreeMap::new();
                if let Some(n) = serde_json::Number::from_f64(t) {
                    map.insert("temperature".to_string(), Value::Number(n));
                }
                map
            }
            None => self.parameters.clone(),
        }
    }
}
