//! Engine lifecycle transitions.
//!
//! The lifecycle is process-wide, so the whole sequence runs as one test in
//! its own binary, starting from a pristine process.

use imgpipe::{ops, Error, ImageHandle, LifecycleState, Runtime};

#[test]
fn lifecycle_sequence() {
    let runtime = Runtime::default();

    // Nothing has started the engine yet.
    assert_eq!(runtime.state(), LifecycleState::Uninitialized);
    runtime.shutdown();
    assert_eq!(runtime.state(), LifecycleState::Uninitialized);
    assert_eq!(
        ops::black(&runtime, 4, 4, 1).unwrap_err(),
        Error::LifecycleViolation(LifecycleState::Uninitialized)
    );
    assert_eq!(
        ImageHandle::load(&runtime, b"\x89PNG\r\n\x1a\n\0\0\0\x0dIHDR").unwrap_err(),
        Error::LifecycleViolation(LifecycleState::Uninitialized)
    );

    // Second initialize is a no-op.
    runtime.initialize().unwrap();
    runtime.initialize().unwrap();
    assert_eq!(runtime.state(), LifecycleState::Ready);
    assert!(Runtime::global().is_ready(), "state is shared by every runtime");

    let img = ops::black(&runtime, 8, 8, 3).unwrap();
    assert!(runtime.memory_stats().allocations > 0);

    runtime.shutdown();
    assert_eq!(runtime.state(), LifecycleState::Stopped);

    // Handles outliving the engine can no longer be operated on.
    assert_eq!(
        ops::zoom(img, 2).unwrap_err(),
        Error::LifecycleViolation(LifecycleState::Stopped)
    );
    runtime.shutdown();
    assert_eq!(runtime.state(), LifecycleState::Stopped);

    // The engine may be started again.
    runtime.initialize().unwrap();
    assert_eq!(runtime.state(), LifecycleState::Ready);
    let img = ops::black(&runtime, 2, 3, 1).unwrap();
    assert_eq!((img.width(), img.height()), (2, 3));
    drop(img);
    runtime.shutdown();
}
