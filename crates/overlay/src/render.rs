//! GDI rendering of the frozen screenshot

use crate::selection::SelectionRect;
use capture_gdi::{Rect, ScreenBuffer};
use std::mem::size_of;
use std::sync::Arc;
use windows::Win32::Foundation::COLORREF;
use windows::Win32::Graphics::Gdi::{
    CreatePen, DeleteObject, GetStockObject, IntersectClipRect, Rectangle, RestoreDC, SaveDC,
    SelectObject, SetDIBitsToDevice, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    HDC, HOLLOW_BRUSH, PS_SOLID,
};

/// Selection outline: solid green, two pixels wide.
const OUTLINE_COLOR: COLORREF = COLORREF(0x0000FF00);
const OUTLINE_THICKNESS: i32 = 2;

/// The two same-size views of one capture: the shared canonical shot
/// ("light") and a per-channel-halved copy ("dark"). The canonical pixels
/// are never touched, so extraction after the drag reads true colors with
/// no inverse brightness step.
pub struct OverlayFrames {
    shot: Arc<ScreenBuffer>,
    dimmed: Vec<u32>,
}

impl OverlayFrames {
    pub fn new(shot: Arc<ScreenBuffer>) -> Self {
        let dimmed = shot.dimmed();
        Self { shot, dimmed }
    }

    pub fn width(&self) -> u32 {
        self.shot.width
    }

    pub fn height(&self) -> u32 {
        self.shot.height
    }

    pub fn shot(&self) -> &Arc<ScreenBuffer> {
        &self.shot
    }

    /// Paint one frame: dark backdrop across the window, the light image
    /// clipped to the live selection, outline on top.
    pub fn render(&self, hdc: HDC, selection: SelectionRect) {
        unsafe {
            self.blit(hdc, &self.dimmed);

            if !selection.is_invalid() {
                // GDI's Rectangle and clip regions are not guaranteed to
                // accept inverted extents, so both draws use the
                // normalized rect.
                let rect = selection.normalized();

                let saved = SaveDC(hdc);
                IntersectClipRect(hdc, rect.x, rect.y, rect.right(), rect.bottom());
                self.blit(hdc, &self.shot.pixels);
                let _ = RestoreDC(hdc, saved);

                self.draw_outline(hdc, &rect);
            }
        }
    }

    unsafe fn blit(&self, hdc: HDC, pixels: &[u32]) {
        let width = self.shot.width as i32;
        let height = self.shot.height as i32;

        let bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height, // Top-down
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

        SetDIBitsToDevice(
            hdc,
            0,
            0,
            width as u32,
            height as u32,
            0,
            0,
            0,
            height as u32,
            pixels.as_ptr() as *const _,
            &bmi,
            DIB_RGB_COLORS,
        );
    }

    unsafe fn draw_outline(&self, hdc: HDC, rect: &Rect) {
        let pen = CreatePen(PS_SOLID, OUTLINE_THICKNESS, OUTLINE_COLOR);
        let old_pen = SelectObject(hdc, pen);
        let old_brush = SelectObject(hdc, GetStockObject(HOLLOW_BRUSH));

        let _ = Rectangle(hdc, rect.x, rect.y, rect.right(), rect.bottom());

        SelectObject(hdc, old_brush);
        SelectObject(hdc, old_pen);
        let _ = DeleteObject(pen);
    }
}
