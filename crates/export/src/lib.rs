//! Export module for SnipClip
//!
//! Turns a committed selection into clipboard content.

mod clipboard;

pub use clipboard::copy_region;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[error("selection does not intersect the captured screen")]
    EmptySelection,
}

pub type ExportResult<T> = Result<T, ExportError>;
