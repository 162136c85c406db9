//! Parameter presets stored as versioned JSON documents.

use relief_types::{ParamError, ReliefParams};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Format identifier written into every preset.
pub const PRESET_FORMAT: &str = "image-relief";

/// Current preset format version.
pub const PRESET_VERSION: u32 = 1;

/// Errors while loading or saving presets.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse preset: {0}")]
    ParseError(String),

    #[error("unknown preset format: {0}")]
    UnknownFormat(String),

    #[error("preset version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("preset holds invalid parameters: {0}")]
    Invalid(#[from] ParamError),

    #[error("failed to serialize preset: {0}")]
    SerializeError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PresetFile {
    format: String,
    version: u32,
    params: ReliefParams,
}

/// Parse a preset document and validate its parameters.
pub fn load_preset(json: &str) -> Result<ReliefParams, ConfigError> {
    let raw: PresetFile =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if raw.format != PRESET_FORMAT {
        return Err(ConfigError::UnknownFormat(raw.format));
    }
    if raw.version > PRESET_VERSION {
        return Err(ConfigError::FutureVersion {
            file_version: raw.version,
            supported_version: PRESET_VERSION,
        });
    }

    raw.params.validate()?;
    debug!(version = raw.version, "preset loaded");
    Ok(raw.params)
}

/// Serialize parameters to a pretty-printed preset document.
pub fn save_preset(params: &ReliefParams) -> Result<String, ConfigError> {
    let file = PresetFile {
        format: PRESET_FORMAT.to_string(),
        version: PRESET_VERSION,
        params: params.clone(),
    };
    serde_json::to_string_pretty(&file).map_err(|e| ConfigError::SerializeError(e.to_string()))
}
