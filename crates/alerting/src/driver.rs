//! Flash driver

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::status::AlertStatus;

/// Flash cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Sleep between phase advances while alerting (ms)
    pub flash_on_interval_ms: u64,
    /// Poll interval while safe (ms)
    pub flash_off_interval_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            flash_on_interval_ms: 200,
            flash_off_interval_ms: 100,
        }
    }
}

impl AlertConfig {
    pub fn flash_on_interval(&self) -> Duration {
        Duration::from_millis(self.flash_on_interval_ms)
    }

    pub fn flash_off_interval(&self) -> Duration {
        Duration::from_millis(self.flash_off_interval_ms)
    }
}

/// Advances the flash phase on a wall-clock cadence while the alert is up.
///
/// Has no dependency on frame acquisition or detection, so a stalled
/// detector does not stall the flashing.
pub struct AlertDriver {
    status: Arc<AlertStatus>,
    config: AlertConfig,
}

impl AlertDriver {
    pub fn new(status: Arc<AlertStatus>, config: AlertConfig) -> Self {
        Self { status, config }
    }

    /// One driver step; returns how long to sleep before the next one
    pub fn tick(&self) -> Duration {
        if self.status.is_alert_active() {
            let phase = self.status.advance_flash();
            debug!("Flash phase {}", phase);
            self.config.flash_on_interval()
        } else {
            self.status.reset_flash();
            self.config.flash_off_interval()
        }
    }

    /// Run until `shutdown` turns true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Alert driver started (on {}ms, off {}ms)",
            self.config.flash_on_interval_ms, self.config.flash_off_interval_ms
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let delay = self.tick();
            let sender_gone = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if sender_gone {
                break;
            }
        }

        self.status.reset_flash();
        info!("Alert driver stopped");
    }

    /// Spawn onto the current tokio runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
