//! Virtual desktop capture using GDI

use crate::{CaptureError, CaptureResult, ScreenBuffer, VirtualScreen};
use std::mem::size_of;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ, ROP_CODE, SRCCOPY,
};

// GDI handles released on every exit path, error paths included.

struct ScreenDc(HDC);

impl ScreenDc {
    fn acquire() -> CaptureResult<Self> {
        let dc = unsafe { GetDC(None) };
        if dc.is_invalid() {
            return Err(CaptureError::Gdi("failed to get screen DC".into()));
        }
        Ok(Self(dc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(None, self.0);
        }
    }
}

struct MemDc(HDC);

impl MemDc {
    fn compatible(screen: &ScreenDc) -> CaptureResult<Self> {
        let dc = unsafe { CreateCompatibleDC(screen.0) };
        if dc.is_invalid() {
            return Err(CaptureError::Gdi("failed to create memory DC".into()));
        }
        Ok(Self(dc))
    }
}

impl Drop for MemDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct TargetBitmap(HBITMAP);

impl TargetBitmap {
    fn compatible(screen: &ScreenDc, width: i32, height: i32) -> CaptureResult<Self> {
        let bitmap = unsafe { CreateCompatibleBitmap(screen.0, width, height) };
        if bitmap.is_invalid() {
            return Err(CaptureError::Gdi("failed to create capture bitmap".into()));
        }
        Ok(Self(bitmap))
    }
}

impl Drop for TargetBitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.0);
        }
    }
}

/// Keeps the previously selected object and restores it on drop so the
/// bitmap can be deleted afterwards.
struct Selected<'a> {
    dc: &'a MemDc,
    old: HGDIOBJ,
}

impl<'a> Selected<'a> {
    fn bitmap(dc: &'a MemDc, bitmap: &TargetBitmap) -> Self {
        let old = unsafe { SelectObject(dc.0, bitmap.0) };
        Self { dc, old }
    }
}

impl Drop for Selected<'_> {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc.0, self.old);
        }
    }
}

/// Grab the whole virtual desktop at full resolution.
///
/// Pixel format is fixed 32-bit BGRX (blue in the low byte of each `u32`),
/// rows top-down. Any geometry or GDI failure surfaces as a
/// [`CaptureError`] instead of handing back a stale or undersized buffer.
pub fn capture_virtual_screen() -> CaptureResult<ScreenBuffer> {
    let screen = VirtualScreen::query()?;

    unsafe {
        let screen_dc = ScreenDc::acquire()?;
        let mem_dc = MemDc::compatible(&screen_dc)?;
        let bitmap = TargetBitmap::compatible(&screen_dc, screen.width, screen.height)?;
        let _selected = Selected::bitmap(&mem_dc, &bitmap);

        // CAPTUREBLT includes layered windows in the copy.
        BitBlt(
            mem_dc.0,
            0,
            0,
            screen.width,
            screen.height,
            screen_dc.0,
            screen.x,
            screen.y,
            ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
        )?;

        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: screen.width,
                biHeight: -screen.height, // Top-down
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default()],
        };

        let mut pixels = vec![0u32; (screen.width * screen.height) as usize];
        let copied = GetDIBits(
            mem_dc.0,
            bitmap.0,
            0,
            screen.height as u32,
            Some(pixels.as_mut_ptr() as *mut _),
            &mut bmi,
            DIB_RGB_COLORS,
        );
        if copied == 0 {
            return Err(CaptureError::Gdi("GetDIBits copied no scan lines".into()));
        }

        Ok(ScreenBuffer {
            pixels,
            width: screen.width as u32,
            height: screen.height as u32,
            virtual_left: screen.x,
            virtual_top: screen.y,
        })
    }
}
