// crates/catalog-publish-core/src/runtime/clock.rs
// ============================================================================
// Module: Clocks
// Description: Wall-clock and fixed clock implementations.
// Purpose: Supply sync attempt timestamps to the synchronizer.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The publisher never reads ambient time directly. [`SystemClock`] backs
//! production runs and [`FixedClock`] lets tests step time explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Clock returning a caller-controlled instant.
#[derive(Debug)]
pub struct FixedClock {
    /// Current instant.
    now: Mutex<Timestamp>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub const fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.lock().map_or(Timestamp::from_unix_millis(0), |guard| *guard)
    }
}
