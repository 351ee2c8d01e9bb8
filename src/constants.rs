//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency across the codebase.

/// Fade table key used when a source has no profile of its own
pub const DEFAULT_FADE_KEY: &str = "default";

/// Tracks shorter than this (in milliseconds) are never faded
pub const SHORT_TRACK_MS: f64 = 4000.0;

/// Volume used when nothing else has been configured
pub const DEFAULT_VOLUME: f32 = 0.5;

/// File extension for per-source catalog files
pub const SOURCE_EXTENSION: &str = "json";

/// Data directory layout
pub const SOURCES_DIR: &str = "sources";
pub const TEXT_DIR: &str = "text";
pub const PRIMARY_TEXT_FILE: &str = "primary.json";
pub const SECONDARY_TEXT_FILE: &str = "secondary.json";
pub const NAMES_FILE: &str = "names.json";

/// Characters stripped from the start of secondary text
pub const SECONDARY_TEXT_TRIM: &[char] = &[',', '.'];

/// Where the terminal player writes its log
pub const LOG_FILE: &str = "/tmp/lounge.log";
