//! User-facing instructions for granting hook permissions.

/// What the user has to do outside the program for the global hook to work.
#[cfg(target_os = "macos")]
pub fn permission_hint() -> &'static str {
    "clicktally needs accessibility permission to count clicks.\n\
     Open System Settings > Privacy & Security > Accessibility, add the\n\
     terminal (or app) running clicktally, make sure it is checked, then\n\
     restart clicktally. Until then the counter runs but sees no clicks."
}

#[cfg(target_os = "windows")]
pub fn permission_hint() -> &'static str {
    "clicktally could not install the global mouse hook.\n\
     Run it from a terminal started with 'Run as administrator' and try again.\n\
     Until then the counter runs but sees no clicks."
}

#[cfg(target_os = "linux")]
pub fn permission_hint() -> &'static str {
    "clicktally could not attach to the X server's input stream.\n\
     It needs an X11 session (or XWayland) with the RECORD extension and a\n\
     DISPLAY variable. Until then the counter runs but sees no clicks."
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
pub fn permission_hint() -> &'static str {
    "Global click hooks are not available on this platform; the counter runs but sees no clicks."
}
