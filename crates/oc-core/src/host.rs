//! Host-side notification hooks
//!
//! The boot orchestrator never talks to a UI directly. User-facing failures and warnings go
//! through [`Host::alert`], debugger refreshes through [`Host::notify_map_loaded`].

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Severity of a user-facing alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Bring-up continues after the alert
    Warning,
    /// The boot request was aborted
    Error,
}

/// Callbacks into the embedding frontend
pub trait Host: Send + Sync {
    /// Show a message to the user
    fn alert(&self, level: AlertLevel, message: &str);

    /// The debugger symbol map was loaded, reloaded or cleared
    fn notify_map_loaded(&self);

    /// A new title started; `game_id` is the identifier used for per-game files
    fn notify_title_changed(&self, game_id: &str) {
        let _ = game_id;
    }
}

/// Host that forwards everything to the log
#[derive(Debug, Default)]
pub struct LogHost;

impl Host for LogHost {
    fn alert(&self, level: AlertLevel, message: &str) {
        match level {
            AlertLevel::Warning => warn!("{}", message),
            AlertLevel::Error => error!("{}", message),
        }
    }

    fn notify_map_loaded(&self) {
        info!("Debugger symbol map updated");
    }

    fn notify_title_changed(&self, game_id: &str) {
        info!("Title changed: {}", game_id);
    }
}

/// Host that remembers every notification, for tests and headless frontends
#[derive(Debug, Default)]
pub struct RecordingHost {
    alerts: Mutex<Vec<(AlertLevel, String)>>,
    map_loaded: Mutex<u32>,
    titles: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts raised so far
    pub fn alerts(&self) -> Vec<(AlertLevel, String)> {
        self.alerts.lock().clone()
    }

    /// Alerts of the given level
    pub fn alerts_of(&self, level: AlertLevel) -> Vec<String> {
        self.alerts
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of "map loaded" notifications
    pub fn map_loaded_count(&self) -> u32 {
        *self.map_loaded.lock()
    }

    /// Game ids passed to `notify_title_changed`
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().clone()
    }
}

impl Host for RecordingHost {
    fn alert(&self, level: AlertLevel, message: &str) {
        self.alerts.lock().push((level, message.to_string()));
    }

    fn notify_map_loaded(&self) {
        *self.map_loaded.lock() += 1;
    }

    fn notify_title_changed(&self, game_id: &str) {
        self.titles.lock().push(game_id.to_string());
    }
}
