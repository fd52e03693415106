//! SnipClip - hotkey-driven region screenshot to clipboard

#![windows_subsystem = "windows"]

mod hotkey;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};
use overlay::{OverlayFrames, OverlayWindow, SelectionOutcome};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WM_QUIT,
};

use crate::hotkey::{HotkeyEvent, KeyboardHook};

/// Pump pacing while no session is running.
const IDLE_POLL: Duration = Duration::from_millis(10);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Virtual-screen metrics must come back in physical pixels.
    unsafe {
        let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
    }

    let (event_tx, event_rx) = bounded::<HotkeyEvent>(4);
    let hook = KeyboardHook::install(event_tx)?;

    log::info!("ready: Shift+` to snip, Escape during selection to quit");
    run_event_pump(&event_rx);

    // Explicit to make the removal point visible in the logs.
    drop(hook);
    log::info!("shutting down");

    Ok(())
}

/// Cooperative single-threaded pump. The low-level hook needs this thread
/// to keep dispatching messages, and snip sessions run synchronously
/// here, so capture, render and export never overlap: the hook callback
/// only ever enqueues, the buffer has exactly one writer.
fn run_event_pump(event_rx: &Receiver<HotkeyEvent>) {
    loop {
        if !pump_thread_messages() {
            break;
        }

        if let Ok(HotkeyEvent::CaptureRequested) = event_rx.try_recv() {
            match run_snip_session() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => log::error!("snip failed: {e:#}"),
            }
            // Presses queued while the overlay was up do not retrigger.
            while event_rx.try_recv().is_ok() {}
        }

        thread::sleep(IDLE_POLL);
    }
}

/// Dispatch pending messages for this thread. Returns false on WM_QUIT.
fn pump_thread_messages() -> bool {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return false;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    true
}

/// One hotkey-to-clipboard cycle. Returns false when the user quit from
/// the overlay.
fn run_snip_session() -> anyhow::Result<bool> {
    let shot = Arc::new(capture_gdi::capture_virtual_screen()?);
    log::info!(
        "captured {}x{} virtual screen at ({}, {})",
        shot.width,
        shot.height,
        shot.virtual_left,
        shot.virtual_top
    );

    let frames = OverlayFrames::new(shot.clone());
    match OverlayWindow::select(frames)? {
        SelectionOutcome::Region(raw) => {
            let rect = raw.normalized();
            log::info!(
                "selection committed: {}x{} at ({}, {})",
                rect.width,
                rect.height,
                rect.x,
                rect.y
            );
            export::copy_region(&shot, rect)?;
            log::info!("region copied to clipboard");
            Ok(true)
        }
        SelectionOutcome::Quit => Ok(false),
    }
}
