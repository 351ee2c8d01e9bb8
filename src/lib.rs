pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod fade;
pub mod library;
pub mod media;
pub mod playlist;
pub mod selector;
pub mod sync;
pub mod tables;

pub use error::{LoungeError, Result};
