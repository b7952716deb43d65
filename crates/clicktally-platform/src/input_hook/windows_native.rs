//! Windows native implementation for click hooking.
//!
//! Installs a `WH_MOUSE_LL` hook and pumps messages on the hook thread. The
//! hook procedure must return quickly or Windows silently removes it, so it
//! only hands the button to the sink.

use super::{ClickSink, HookBackend, HookContext};
use crate::error::PlatformError;
use clicktally_core::MouseButton;
use std::cell::RefCell;
use std::thread;
use tracing::{debug, error, info};
use windows_sys::Win32::Foundation::{GetLastError, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_MOUSE_LL,
    WM_LBUTTONDOWN, WM_MBUTTONDOWN, WM_QUIT, WM_RBUTTONDOWN, WM_USER, WM_XBUTTONDOWN,
};

// The hook procedure runs on the thread that installed the hook.
thread_local! {
    static SINK: RefCell<Option<ClickSink>> = const { RefCell::new(None) };
}

pub struct LowLevelMouseHook;

impl HookBackend for LowLevelMouseHook {
    fn name(&self) -> &'static str {
        "windows-ll-mouse"
    }

    fn run(self: Box<Self>, ctx: HookContext) {
        info!("Click hook thread started (Windows WH_MOUSE_LL)");

        let thread_id = unsafe { GetCurrentThreadId() };
        SINK.with(|sink| {
            *sink.borrow_mut() = Some(ctx.sink.clone());
        });

        // Force creation of this thread's message queue so WM_QUIT can be posted.
        let mut msg: MSG = unsafe { std::mem::zeroed() };
        unsafe { PeekMessageW(&mut msg, std::ptr::null_mut(), WM_USER, WM_USER, PM_NOREMOVE) };

        let hook = unsafe {
            SetWindowsHookExW(
                WH_MOUSE_LL,
                Some(mouse_hook_proc),
                GetModuleHandleW(std::ptr::null()),
                0,
            )
        };
        if hook.is_null() {
            let code = unsafe { GetLastError() };
            error!(code, "Failed to install mouse hook");
            SINK.with(|sink| sink.borrow_mut().take());
            ctx.report_ready(Err(PlatformError::PermissionDenied(format!(
                "SetWindowsHookExW failed with error {}",
                code
            ))));
            return;
        }
        debug!("Mouse hook installed");
        ctx.report_ready(Ok(()));

        // Stop signal (or the listener going away) ends the message loop.
        let stop_rx = ctx.stop_rx.clone();
        let watcher = thread::spawn(move || {
            let _ = stop_rx.recv();
            info!("Stop signal received, posting WM_QUIT");
            unsafe { PostThreadMessageW(thread_id, WM_QUIT, 0, 0) };
        });

        loop {
            let ret = unsafe { GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) };
            if ret <= 0 {
                // WM_QUIT or error
                break;
            }
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        info!("Unhooking mouse hook");
        unsafe { UnhookWindowsHookEx(hook) };
        SINK.with(|sink| sink.borrow_mut().take());

        let _ = watcher.join();
        info!("Click hook thread exiting");
    }
}

/// Low-level mouse hook procedure.
unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let button = match wparam as u32 {
            WM_LBUTTONDOWN => Some(MouseButton::Left),
            WM_RBUTTONDOWN => Some(MouseButton::Right),
            WM_MBUTTONDOWN => Some(MouseButton::Middle),
            WM_XBUTTONDOWN => Some(MouseButton::Other),
            _ => None,
        };

        if let Some(button) = button {
            SINK.with(|sink| {
                if let Some(sink) = sink.borrow().as_ref() {
                    sink.emit(button);
                }
            });
        }
    }

    CallNextHookEx(std::ptr::null_mut(), code, wparam, lparam)
}
