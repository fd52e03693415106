//! Packed-DIB clipboard placement

use crate::{ExportError, ExportResult};
use capture_gdi::{Rect, RegionBuffer, ScreenBuffer};
use std::mem::size_of;
use windows::Win32::Foundation::{HANDLE, HGLOBAL};
use windows::Win32::Graphics::Gdi::{BITMAPINFOHEADER, BI_RGB};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
};
use windows::Win32::System::Memory::{
    GlobalAlloc, GlobalFree, GlobalLock, GlobalUnlock, GMEM_MOVEABLE,
};
use windows::Win32::System::Ole::CF_DIB;

/// Open clipboard, closed on drop so no exit path can leak it.
struct ClipboardGuard;

impl ClipboardGuard {
    fn open() -> ExportResult<Self> {
        unsafe { OpenClipboard(None)? };
        Ok(Self)
    }
}

impl Drop for ClipboardGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseClipboard();
        }
    }
}

/// Serialize a region as a packed DIB: BITMAPINFOHEADER followed by 32bpp
/// BGRX rows, top-down (negative height).
fn dib_bytes(region: &RegionBuffer) -> Vec<u8> {
    let header = BITMAPINFOHEADER {
        biSize: size_of::<BITMAPINFOHEADER>() as u32,
        biWidth: region.width as i32,
        biHeight: -(region.height as i32),
        biPlanes: 1,
        biBitCount: 32,
        biCompression: BI_RGB.0,
        biSizeImage: region.width * region.height * 4,
        biXPelsPerMeter: 0,
        biYPelsPerMeter: 0,
        biClrUsed: 0,
        biClrImportant: 0,
    };

    let mut bytes = Vec::with_capacity(size_of::<BITMAPINFOHEADER>() + region.pixels.len() * 4);
    bytes.extend_from_slice(unsafe {
        std::slice::from_raw_parts(
            &header as *const BITMAPINFOHEADER as *const u8,
            size_of::<BITMAPINFOHEADER>(),
        )
    });
    for px in &region.pixels {
        bytes.extend_from_slice(&px.to_le_bytes());
    }

    bytes
}

/// Extract `rect` from the canonical capture (clamping it to the buffer
/// bounds) and replace the clipboard contents with the result as a
/// bitmap.
///
/// `rect` must already be normalized; the extraction reads the canonical
/// pixels, so no brightness restoration is involved.
pub fn copy_region(shot: &ScreenBuffer, rect: Rect) -> ExportResult<()> {
    let region = shot.extract(rect).ok_or(ExportError::EmptySelection)?;
    let bytes = dib_bytes(&region);

    unsafe { place_dib(&bytes) }
}

unsafe fn place_dib(bytes: &[u8]) -> ExportResult<()> {
    let hmem = GlobalAlloc(GMEM_MOVEABLE, bytes.len())?;

    let dst = GlobalLock(hmem);
    if dst.is_null() {
        free(hmem);
        return Err(windows::core::Error::from_win32().into());
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, bytes.len());
    let _ = GlobalUnlock(hmem);

    let guard = match ClipboardGuard::open() {
        Ok(guard) => guard,
        Err(e) => {
            free(hmem);
            return Err(e);
        }
    };

    if let Err(e) = EmptyClipboard() {
        free(hmem);
        return Err(e.into());
    }

    // On success the system owns the allocation; free it only on failure.
    if let Err(e) = SetClipboardData(CF_DIB.0 as u32, HANDLE(hmem.0)) {
        free(hmem);
        return Err(e.into());
    }

    drop(guard);
    Ok(())
}

unsafe fn free(hmem: HGLOBAL) {
    let _ = GlobalFree(hmem);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(width: u32, height: u32) -> RegionBuffer {
        RegionBuffer {
            pixels: (0..width * height).collect(),
            width,
            height,
        }
    }

    #[test]
    fn dib_is_header_then_payload() {
        let r = region(100, 50);
        let bytes = dib_bytes(&r);

        let header_len = size_of::<BITMAPINFOHEADER>();
        assert_eq!(header_len, 40);
        assert_eq!(bytes.len(), header_len + 100 * 50 * 4);
        assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
    }

    #[test]
    fn dib_header_dimensions_are_top_down() {
        let bytes = dib_bytes(&region(100, 50));

        assert_eq!(&bytes[4..8], &100i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-50i32).to_le_bytes());
        // biPlanes = 1, biBitCount = 32
        assert_eq!(&bytes[12..14], &1u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &32u16.to_le_bytes());
    }

    #[test]
    fn dib_payload_preserves_pixel_order() {
        let r = region(4, 3);
        let bytes = dib_bytes(&r);

        let at = |x: u32, y: u32| {
            let offset = 40 + ((y * 4 + x) * 4) as usize;
            u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
        };

        assert_eq!(at(0, 0), 0);
        assert_eq!(at(3, 0), 3);
        assert_eq!(at(0, 1), 4);
        assert_eq!(at(3, 2), 11);
    }

    #[test]
    fn extraction_feeds_canonical_pixels_into_the_dib() {
        let shot = ScreenBuffer {
            pixels: (0..200u32 * 100).collect(),
            width: 200,
            height: 100,
            virtual_left: 0,
            virtual_top: 0,
        };

        let r = shot.extract(Rect::new(10, 10, 100, 50)).unwrap();
        let bytes = dib_bytes(&r);

        // Image pixel (0, 0) is the capture's pixel (10, 10).
        let first = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        assert_eq!(first, 10 * 200 + 10);
    }
}
