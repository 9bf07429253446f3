// this_file: src/config.rs
//! Serializable settings for font handles and decoder sessions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default chunk size for stream-backed decoder input.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default growth step for box output buffers.
pub const DEFAULT_BOX_CHUNK_SIZE: usize = 64 * 1024;

/// Which layout strategy a font handle asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutEngine {
    /// Character-by-character layout with legacy kerning
    Basic,
    /// Full shaping through the complex engine
    #[default]
    Complex,
}

/// Options used when opening a font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontOptions {
    /// Pixel size (ppem)
    pub size: f32,
    /// Face index within a collection
    pub index: u32,
    /// Charmap encoding tag such as `unic` or `symb`
    pub encoding: Option<String>,
    pub layout_engine: LayoutEngine,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            size: 10.0,
            index: 0,
            encoding: None,
            layout_engine: LayoutEngine::default(),
        }
    }
}

impl FontOptions {
    pub fn with_size(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

/// Options used by decoder sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Bytes read per refill from stream sources
    pub chunk_size: usize,
    /// Growth step when a box needs more output space
    pub box_chunk_size: usize,
    /// Ask the codec to decompress `brob` boxes
    pub decompress_boxes: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            box_chunk_size: DEFAULT_BOX_CHUNK_SIZE,
            decompress_boxes: true,
        }
    }
}

impl DecoderOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidParameter("chunk_size must be positive".into()));
        }
        if self.box_chunk_size == 0 {
            return Err(Error::InvalidParameter(
                "box_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub font: FontOptions,
    pub decoder: DecoderOptions,
}

impl Config {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.decoder.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.decoder.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.font.layout_engine, LayoutEngine::Complex);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = Config::from_json(
            r#"{"font": {"size": 24.0, "layout_engine": "basic"}, "decoder": {"decompress_boxes": false}}"#,
        )
        .unwrap();
        assert_eq!(config.font.size, 24.0);
        assert_eq!(config.font.index, 0);
        assert_eq!(config.font.layout_engine, LayoutEngine::Basic);
        assert!(!config.decoder.decompress_boxes);
        assert_eq!(config.decoder.box_chunk_size, DEFAULT_BOX_CHUNK_SIZE);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = Config::from_json(r#"{"decoder": {"chunk_size": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = Config::from_json("{ nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imgbridge.json");
        std::fs::write(&path, r#"{"font": {"index": 2}}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.font.index, 2);
    }
}
