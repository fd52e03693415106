//! Global hotkey via a low-level keyboard hook
//!
//! The hook callback runs via this thread's message queue, so it must
//! stay cheap: it only tracks modifier state and enqueues an event. It
//! never captures the screen or touches window state itself.

use crossbeam_channel::Sender;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    VK_LMENU, VK_LSHIFT, VK_OEM_3, VK_RMENU, VK_RSHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

/// Events the hook hands over to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    CaptureRequested,
}

/// Modifier state tracked per key: a key-up clears only the modifier that
/// was actually released.
#[derive(Debug, Clone, Copy)]
struct Modifiers {
    shift: bool,
    alt: bool,
}

static EVENTS: OnceCell<Sender<HotkeyEvent>> = OnceCell::new();
static MODIFIERS: Mutex<Modifiers> = Mutex::new(Modifiers {
    shift: false,
    alt: false,
});

/// Installed low-level keyboard hook, removed on drop.
pub struct KeyboardHook {
    hook: HHOOK,
}

impl KeyboardHook {
    /// Install the process-wide hook on the calling thread. The event
    /// sender can be set once per process.
    pub fn install(events: Sender<HotkeyEvent>) -> anyhow::Result<Self> {
        EVENTS
            .set(events)
            .map_err(|_| anyhow::anyhow!("keyboard hook already installed"))?;

        let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0)? };
        log::info!("keyboard hook installed");
        Ok(Self { hook })
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = UnhookWindowsHookEx(self.hook) {
                log::error!("failed to remove keyboard hook: {e}");
            } else {
                log::info!("keyboard hook removed");
            }
        }
    }
}

unsafe extern "system" fn keyboard_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
    if n_code >= 0 {
        let kb = *(l_param.0 as *const KBDLLHOOKSTRUCT);

        match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => on_key_down(kb.vkCode),
            WM_KEYUP | WM_SYSKEYUP => on_key_up(kb.vkCode),
            _ => {}
        }
    }

    // Always forward so other system-wide keyboard processing keeps
    // working, whether or not the event armed or fired the hotkey.
    CallNextHookEx(None, n_code, w_param, l_param)
}

fn on_key_down(vk: u32) {
    let mut mods = MODIFIERS.lock();

    if vk == VK_LSHIFT.0 as u32 || vk == VK_RSHIFT.0 as u32 {
        mods.shift = true;
    } else if vk == VK_LMENU.0 as u32 || vk == VK_RMENU.0 as u32 {
        mods.alt = true;
    } else if vk == VK_OEM_3.0 as u32 && mods.shift {
        // One-shot arming: shift must be pressed again for the next snip.
        mods.shift = false;
        log::debug!("capture hotkey fired (alt held: {})", mods.alt);
        if let Some(events) = EVENTS.get() {
            let _ = events.try_send(HotkeyEvent::CaptureRequested);
        }
    }
}

fn on_key_up(vk: u32) {
    let mut mods = MODIFIERS.lock();

    if vk == VK_LSHIFT.0 as u32 || vk == VK_RSHIFT.0 as u32 {
        mods.shift = false;
    } else if vk == VK_LMENU.0 as u32 || vk == VK_RMENU.0 as u32 {
        mods.alt = false;
    }
}
