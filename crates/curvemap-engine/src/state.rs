//! Everything the host persists between sessions.

use serde::{Deserialize, Serialize};

use curvemap_core::{NodeRecord, PresetError};

use crate::midi::MidiRouting;

/// The last size of the editor window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub width: u32,
    pub height: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            width: 500,
            height: 300,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginState {
    pub ui: UiState,
    pub routing: MidiRouting,
    pub curve: Vec<NodeRecord>,
}

impl PluginState {
    pub fn to_json(&self) -> Result<String, PresetError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MidiDestination, MidiSource};

    #[test]
    fn missing_fields_use_defaults() {
        let state = PluginState::from_json(r#"{ "ui": { "width": 640 } }"#).unwrap();

        assert_eq!(
            state.ui,
            UiState {
                width: 640,
                height: 300
            }
        );
        assert_eq!(state.routing, MidiRouting::default());
        assert!(state.curve.is_empty());
    }

    #[test]
    fn routing_is_persisted() {
        let state = PluginState {
            routing: MidiRouting {
                source: MidiSource::Controller(1),
                destination: MidiDestination::PitchBend,
            },
            ..Default::default()
        };

        let loaded = PluginState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(loaded, state);
    }
}
