//! Alerting System
//!
//! Provides the shared alert status handle and the flash driver that keeps
//! the visual alert rhythmic regardless of the frame rate.

mod driver;
mod status;

pub use driver::{AlertConfig, AlertDriver};
pub use status::{flash_visible, AlertStatus, FLASH_ON_TICKS, FLASH_PERIOD};
