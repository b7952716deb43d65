use clicktally_platform::{native_backend, PlatformError};

#[test]
fn native_backend_can_only_be_claimed_once() {
    // Claiming does not register anything with the OS; only `start` does.
    let first = native_backend();
    if let Err(e) = &first {
        assert_eq!(*e, PlatformError::Unsupported);
    }

    let second = native_backend();
    assert!(matches!(second, Err(PlatformError::AlreadyRegistered)));
}
