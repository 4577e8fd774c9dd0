//! Global switch for protocol diagnostics.
//!
//! Front-ends that render the backend console themselves may want to silence
//! the engine's own warnings about orphaned records and unanswered commands.

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

#[inline(always)]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst)
}

pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst)
}

#[macro_export]
macro_rules! mi_info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::info!(target: $target, $($arg)+)
        }
    };
    ($($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::info!(target: "mi", $($arg)+)
        }
    };
}

#[macro_export]
macro_rules! mi_warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::warn!(target: $target, $($arg)+)
        }
    };
    ($($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::warn!(target: "mi", $($arg)+)
        }
    };
}

#[macro_export]
macro_rules! mi_error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::error!(target: $target, $($arg)+)
        }
    };
    ($($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::error!(target: "mi", $($arg)+)
        }
    };
}

#[macro_export]
macro_rules! mi_debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::debug!(target: $target, $($arg)+)
        }
    };
    ($($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::debug!(target: "mi", $($arg)+)
        }
    };
}

#[cfg(test)]
mod test {
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_switch() {
        assert!(super::is_enabled());
        super::disable();
        assert!(!super::is_enabled());
        // must not panic or log while disabled
        mi_warn!("suppressed {}", 1);
        super::enable();
        assert!(super::is_enabled());
    }
}
