//! Compiler Configuration
//!
//! The only engine-facing knob is source line numbering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfiguration {
    /// Keep 1-based source line numbers on parsed elements so validation
    /// failures can point back into the rules document.
    #[serde(default = "default_true")]
    pub source_line_numbering: bool,
}

fn default_true() -> bool { true }

impl Default for CompilerConfiguration {
    fn default() -> Self {
        Self {
            source_line_numbering: true,
        }
    }
}

impl CompilerConfiguration {
    pub fn without_line_numbers() -> Self {
        Self {
            source_line_numbering: false,
        }
    }

    /// Load from a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
