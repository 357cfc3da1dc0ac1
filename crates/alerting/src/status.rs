//! Shared alert status

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Driver ticks per flash cycle
pub const FLASH_PERIOD: u64 = 4;
/// Ticks per cycle with the overlay shown
pub const FLASH_ON_TICKS: u64 = 2;

/// Whether the overlay is shown for a given flash phase
pub fn flash_visible(phase: u64) -> bool {
    phase % FLASH_PERIOD < FLASH_ON_TICKS
}

/// State shared by the monitor loop and the flash driver.
///
/// Each field has a single writer: `alert_active` is written by the monitor
/// loop, `flash_phase` by the driver. Both are plain atomic words, so no
/// lock is needed.
#[derive(Debug, Default)]
pub struct AlertStatus {
    alert_active: AtomicBool,
    flash_phase: AtomicU64,
}

impl AlertStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the latest decision (monitor loop only)
    pub fn set_alert_active(&self, active: bool) {
        self.alert_active.store(active, Ordering::Release);
    }

    pub fn is_alert_active(&self) -> bool {
        self.alert_active.load(Ordering::Acquire)
    }

    pub fn flash_phase(&self) -> u64 {
        self.flash_phase.load(Ordering::Acquire)
    }

    /// Advance the phase and return the new value (driver only)
    pub fn advance_flash(&self) -> u64 {
        self.flash_phase.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Zero the phase (driver only)
    pub fn reset_flash(&self) {
        self.flash_phase.store(0, Ordering::Release);
    }
}
