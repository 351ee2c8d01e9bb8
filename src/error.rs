//! Error taxonomy for the lounge core.
//!
//! Only `EmptyCatalog` and the loading errors ever reach a caller. Segment
//! parse failures and media failures are recovered where they happen and are
//! kept here so they can be logged with a consistent shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoungeError {
    #[error("no eligible entries in the catalog")]
    EmptyCatalog,

    #[error("malformed segment encoding: {0}")]
    SegmentParse(#[source] serde_json::Error),

    #[error("media playback failed: {0}")]
    MediaPlayback(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LoungeError>;
