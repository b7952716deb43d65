//! macOS native implementation for click hooking.
//!
//! Creates a listen-only `CGEventTap` for mouse-down events on the hook
//! thread's run loop. The run loop is driven in short slices so the thread
//! can notice the stop signal, then the tap is disabled, removed and released.
//! `CGEventTapCreate` returns null when the process lacks the accessibility
//! grant; that is reported as `PermissionDenied`.

use super::{ClickSink, HookBackend, HookContext};
use crate::error::PlatformError;
use clicktally_core::MouseButton;
use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopSource};
use core_graphics::event::{CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType};
use crossbeam_channel::TryRecvError;
use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::ptr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// FFI declarations for functions not exposed by core-graphics crate
type CFMachPortRef = *mut c_void;
type CFRunLoopSourceRef = *mut c_void;
type CFAllocatorRef = *const c_void;
type CFIndex = i64;
type CGEventRef = *mut c_void;

type CGEventTapCallback = extern "C" fn(
    proxy: *mut c_void,
    event_type: CGEventType,
    cg_event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallback,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
}

/// `kCGMouseEventButtonNumber`
const MOUSE_EVENT_BUTTON_NUMBER: u32 = 3;

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFAllocatorRef,
        port: CFMachPortRef,
        order: CFIndex,
    ) -> CFRunLoopSourceRef;

    fn CFMachPortInvalidate(port: CFMachPortRef);

    fn CFRelease(cf: *const c_void);
}

/// How long each run loop slice lasts before the stop signal is checked.
const RUN_SLICE: Duration = Duration::from_millis(100);

// The tap callback runs on the run loop of the thread that created the tap.
thread_local! {
    static SINK: RefCell<Option<ClickSink>> = const { RefCell::new(None) };
    static TAP: Cell<CFMachPortRef> = const { Cell::new(ptr::null_mut()) };
}

pub struct EventTapHook;

impl HookBackend for EventTapHook {
    fn name(&self) -> &'static str {
        "macos-event-tap"
    }

    fn run(self: Box<Self>, ctx: HookContext) {
        info!("Click hook thread started (macOS CGEventTap)");

        SINK.with(|sink| {
            *sink.borrow_mut() = Some(ctx.sink.clone());
        });

        let event_mask: u64 = (1 << CGEventType::LeftMouseDown as u64)
            | (1 << CGEventType::RightMouseDown as u64)
            | (1 << CGEventType::OtherMouseDown as u64);

        let tap = unsafe {
            CGEventTapCreate(
                CGEventTapLocation::Session as u32,
                CGEventTapPlacement::HeadInsertEventTap as u32,
                CGEventTapOptions::ListenOnly as u32,
                event_mask,
                event_tap_callback,
                ptr::null_mut(),
            )
        };

        if tap.is_null() {
            error!("Failed to create event tap - accessibility permission may not be granted");
            SINK.with(|sink| sink.borrow_mut().take());
            ctx.report_ready(Err(PlatformError::PermissionDenied(
                "CGEventTapCreate returned null (accessibility permission not granted)".into(),
            )));
            return;
        }
        TAP.with(|t| t.set(tap));

        let run_loop_source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
        if run_loop_source.is_null() {
            error!("Failed to create run loop source");
            unsafe {
                CFMachPortInvalidate(tap);
                CFRelease(tap as *const c_void);
            }
            SINK.with(|sink| sink.borrow_mut().take());
            ctx.report_ready(Err(PlatformError::PermissionDenied(
                "CFMachPortCreateRunLoopSource failed".into(),
            )));
            return;
        }

        let cf_source = unsafe { CFRunLoopSource::wrap_under_create_rule(run_loop_source as *mut _) };
        let run_loop = CFRunLoop::get_current();
        run_loop.add_source(&cf_source, unsafe { kCFRunLoopCommonModes });
        unsafe { CGEventTapEnable(tap, true) };

        debug!("Event tap enabled");
        ctx.report_ready(Ok(()));

        loop {
            match ctx.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_SLICE, false);
        }

        info!("Removing event tap");
        unsafe { CGEventTapEnable(tap, false) };
        run_loop.remove_source(&cf_source, unsafe { kCFRunLoopCommonModes });
        drop(cf_source);
        unsafe {
            CFMachPortInvalidate(tap);
            CFRelease(tap as *const c_void);
        }
        TAP.with(|t| t.set(ptr::null_mut()));
        SINK.with(|sink| sink.borrow_mut().take());

        info!("Click hook thread exiting");
    }
}

/// Button for an `OtherMouseDown`. Core Graphics numbers the middle button 2.
fn other_button(number: i64) -> MouseButton {
    match number {
        2 => MouseButton::Middle,
        _ => MouseButton::Other,
    }
}

/// Callback function for CGEventTap. Runs in the hook thread's run loop.
extern "C" fn event_tap_callback(
    _proxy: *mut c_void,
    event_type: CGEventType,
    cg_event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    let button = match event_type {
        CGEventType::LeftMouseDown => Some(MouseButton::Left),
        CGEventType::RightMouseDown => Some(MouseButton::Right),
        CGEventType::OtherMouseDown => {
            let number = unsafe { CGEventGetIntegerValueField(cg_event, MOUSE_EVENT_BUTTON_NUMBER) };
            Some(other_button(number))
        }
        CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
            // The system turns slow taps off; turn it back on.
            warn!("Event tap was disabled by the system, re-enabling");
            TAP.with(|t| {
                let tap = t.get();
                if !tap.is_null() {
                    unsafe { CGEventTapEnable(tap, true) };
                }
            });
            None
        }
        _ => None,
    };

    if let Some(button) = button {
        SINK.with(|sink| {
            if let Some(sink) = sink.borrow().as_ref() {
                sink.emit(button);
            }
        });
    }

    // Listen-only tap: pass the event through unchanged.
    cg_event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_mouse_down_numbers() {
        assert_eq!(other_button(2), MouseButton::Middle);
        assert_eq!(other_button(3), MouseButton::Other);
        assert_eq!(other_button(4), MouseButton::Other);
    }
}
