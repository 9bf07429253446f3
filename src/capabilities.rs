// this_file: src/capabilities.rs
//! Process-wide description of the text shaping engine.
//!
//! Detection runs once; the descriptor is immutable afterwards and shared by
//! every font handle.

use serde::Serialize;
use std::sync::OnceLock;

/// Environment switch that forces the basic layout path.
pub const LAYOUT_ENGINE_ENV: &str = "IMGBRIDGE_LAYOUT_ENGINE";

/// Layout of the glyph records this crate reads back from the shaper.
pub const GLYPH_RECORD_VERSION: u32 = 2;

/// What the complex shaping engine can do in this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapingCapabilities {
    /// Complex layout can be used at all
    pub available: bool,
    /// Human readable engine name
    pub engine: &'static str,
    /// Glyph record layout version read back after shaping
    pub record_version: u32,
    /// Top-to-bottom layout is supported
    pub vertical_layout: bool,
}

impl ShapingCapabilities {
    /// Descriptor used when no complex engine is usable.
    pub const fn basic() -> Self {
        Self {
            available: false,
            engine: "basic",
            record_version: GLYPH_RECORD_VERSION,
            vertical_layout: false,
        }
    }

    fn detect() -> Self {
        let forced_basic = std::env::var(LAYOUT_ENGINE_ENV)
            .map(|value| value.eq_ignore_ascii_case("basic"))
            .unwrap_or(false);

        if forced_basic {
            log::info!("{}=basic, complex text layout disabled", LAYOUT_ENGINE_ENV);
            return Self::basic();
        }

        Self::compiled()
    }

    #[cfg(feature = "complex-shaping")]
    fn compiled() -> Self {
        Self {
            available: true,
            engine: "harfbuzz",
            record_version: GLYPH_RECORD_VERSION,
            vertical_layout: true,
        }
    }

    #[cfg(not(feature = "complex-shaping"))]
    fn compiled() -> Self {
        Self::basic()
    }
}

static CAPABILITIES: OnceLock<ShapingCapabilities> = OnceLock::new();

/// The process-wide descriptor, detected on first use.
pub fn shaping() -> &'static ShapingCapabilities {
    CAPABILITIES.get_or_init(|| {
        let caps = ShapingCapabilities::detect();
        log::debug!(
            "Shaping engine: {} (available: {}, vertical: {})",
            caps.engine,
            caps.available,
            caps.vertical_layout
        );
        caps
    })
}
