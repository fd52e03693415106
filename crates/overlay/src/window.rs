//! Overlay window and the selection session loop

use crate::{
    render::OverlayFrames, selection::DragTracker, OverlayResult, SelectionOutcome,
};
use std::cell::RefCell;
use std::mem::size_of;
use std::sync::Once;
use std::time::Duration;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, EndPaint, InvalidateRect, UpdateWindow, PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, LoadCursorW,
    PeekMessageW, RegisterClassExW, SetForegroundWindow, ShowWindow, TranslateMessage,
    IDC_CROSS, MSG, PM_REMOVE, SW_SHOW, WM_CLOSE, WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MOUSEMOVE, WM_PAINT, WM_QUIT, WNDCLASSEXW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};

const OVERLAY_CLASS: PCWSTR = w!("SnipClipOverlay");

/// Cooperative frame pacing: one repaint per loop iteration, then sleep.
/// A rate cap, not vsync.
const FRAME_INTERVAL: Duration = Duration::from_millis(25);

static REGISTER: Once = Once::new();

thread_local! {
    static SESSION: RefCell<Option<Box<SessionState>>> = RefCell::new(None);
}

struct SessionState {
    frames: OverlayFrames,
    tracker: DragTracker,
    outcome: Option<SelectionOutcome>,
}

fn register_class() -> OverlayResult<()> {
    let mut result: OverlayResult<()> = Ok(());
    REGISTER.call_once(|| unsafe {
        let hmodule = match GetModuleHandleW(None) {
            Ok(h) => h,
            Err(e) => {
                result = Err(e.into());
                return;
            }
        };
        let cursor = match LoadCursorW(None, IDC_CROSS) {
            Ok(c) => c,
            Err(e) => {
                result = Err(e.into());
                return;
            }
        };

        let wc = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(OverlayWindow::wnd_proc),
            hInstance: HINSTANCE(hmodule.0),
            hCursor: cursor,
            lpszClassName: OVERLAY_CLASS,
            ..Default::default()
        };

        let _ = RegisterClassExW(&wc);
    });

    result
}

/// Full-screen selection window over the frozen capture.
pub struct OverlayWindow;

impl OverlayWindow {
    /// Show the frozen screenshot and run the selection session to its
    /// outcome. The window is destroyed and the session state dropped on
    /// every return path; the captured pixels live only as long as the
    /// caller keeps its own `Arc`.
    pub fn select(frames: OverlayFrames) -> OverlayResult<SelectionOutcome> {
        register_class()?;

        let shot = frames.shot().clone();
        log::debug!(
            "overlay session over {}x{} at ({}, {})",
            shot.width,
            shot.height,
            shot.virtual_left,
            shot.virtual_top
        );

        SESSION.with(|s| {
            *s.borrow_mut() = Some(Box::new(SessionState {
                frames,
                tracker: DragTracker::new(),
                outcome: None,
            }));
        });

        unsafe {
            let hmodule = GetModuleHandleW(None)?;

            // Borderless, topmost, no task-bar presence, covering the
            // whole virtual screen.
            let hwnd = match CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                OVERLAY_CLASS,
                w!("SnipClip"),
                WS_POPUP,
                shot.virtual_left,
                shot.virtual_top,
                shot.width as i32,
                shot.height as i32,
                None,
                None,
                HINSTANCE(hmodule.0),
                None,
            ) {
                Ok(hwnd) => hwnd,
                Err(e) => {
                    SESSION.with(|s| *s.borrow_mut() = None);
                    return Err(e.into());
                }
            };

            let _ = ShowWindow(hwnd, SW_SHOW);
            let _ = SetForegroundWindow(hwnd);
            let _ = UpdateWindow(hwnd);

            // Cooperative loop: drain input, paint one frame, sleep.
            let outcome = loop {
                let mut msg = MSG::default();
                while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        Self::set_outcome(SelectionOutcome::Quit);
                        continue;
                    }
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }

                let done = SESSION.with(|s| s.borrow().as_ref().and_then(|st| st.outcome));
                if let Some(outcome) = done {
                    break outcome;
                }

                let _ = InvalidateRect(hwnd, None, false);
                let _ = UpdateWindow(hwnd);
                std::thread::sleep(FRAME_INTERVAL);
            };

            let _ = DestroyWindow(hwnd);
            SESSION.with(|s| *s.borrow_mut() = None);

            Ok(outcome)
        }
    }

    fn set_outcome(outcome: SelectionOutcome) {
        SESSION.with(|s| {
            if let Some(ref mut state) = *s.borrow_mut() {
                if state.outcome.is_none() {
                    state.outcome = Some(outcome);
                }
            }
        });
    }

    fn cursor_pos(lparam: LPARAM) -> (i32, i32) {
        let x = (lparam.0 & 0xFFFF) as i16 as i32;
        let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
        (x, y)
    }

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_PAINT => {
                let mut ps = PAINTSTRUCT::default();
                let hdc = BeginPaint(hwnd, &mut ps);
                SESSION.with(|s| {
                    if let Some(ref state) = *s.borrow() {
                        state.frames.render(hdc, state.tracker.rect());
                    }
                });
                let _ = EndPaint(hwnd, &ps);
                LRESULT(0)
            }

            WM_LBUTTONDOWN => {
                let (x, y) = Self::cursor_pos(lparam);
                // Keep coordinates flowing when the drag leaves the
                // window; out-of-bounds rectangles are clamped at
                // extraction.
                SetCapture(hwnd);
                SESSION.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        state.tracker.press(x, y);
                    }
                });
                LRESULT(0)
            }

            WM_MOUSEMOVE => {
                let (x, y) = Self::cursor_pos(lparam);
                SESSION.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        state.tracker.motion(x, y);
                    }
                });
                LRESULT(0)
            }

            WM_LBUTTONUP => {
                let _ = ReleaseCapture();
                SESSION.with(|s| {
                    if let Some(ref mut state) = *s.borrow_mut() {
                        if let Some(committed) = state.tracker.release() {
                            if state.outcome.is_none() {
                                state.outcome = Some(SelectionOutcome::Region(committed));
                            }
                        }
                    }
                });
                LRESULT(0)
            }

            WM_KEYDOWN => {
                const VK_ESCAPE: usize = 0x1B;
                if wparam.0 == VK_ESCAPE {
                    Self::set_outcome(SelectionOutcome::Quit);
                }
                LRESULT(0)
            }

            WM_CLOSE => {
                Self::set_outcome(SelectionOutcome::Quit);
                LRESULT(0)
            }

            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}
