//! Virtual desktop geometry

use crate::{CaptureError, CaptureResult};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

/// Bounding box of all connected monitors, in one coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualScreen {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl VirtualScreen {
    /// Query the current bounds. Re-queried on every capture trigger since
    /// the display configuration can change between snips.
    pub fn query() -> CaptureResult<Self> {
        let screen = unsafe {
            VirtualScreen {
                x: GetSystemMetrics(SM_XVIRTUALSCREEN),
                y: GetSystemMetrics(SM_YVIRTUALSCREEN),
                width: GetSystemMetrics(SM_CXVIRTUALSCREEN),
                height: GetSystemMetrics(SM_CYVIRTUALSCREEN),
            }
        };

        if screen.width <= 0 || screen.height <= 0 {
            return Err(CaptureError::EmptyVirtualScreen);
        }

        Ok(screen)
    }
}
