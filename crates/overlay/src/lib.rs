//! Overlay module for SnipClip
//!
//! Shows the frozen screenshot full-screen and dimmed, and runs the
//! drag-selection session over it.

pub mod render;
pub mod selection;
pub mod window;

pub use render::OverlayFrames;
pub use selection::{DragTracker, SelectionRect};
pub use window::OverlayWindow;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),
}

pub type OverlayResult<T> = Result<T, OverlayError>;

/// Selection session outcome
#[derive(Debug, Clone, Copy)]
pub enum SelectionOutcome {
    /// The user finished a drag. The rectangle is raw: extents may be
    /// negative and must be normalized before use.
    Region(SelectionRect),
    /// Escape or window close: shut the application down.
    Quit,
}
