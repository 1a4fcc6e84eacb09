//! User-facing notifications
//!
//! The engine only raises two notifications: a catch-up credit after a
//! background period and the end of the claim cooldown. Delivery is fire and
//! forget.

use tokio::sync::mpsc;

/// Notification raised by the engine
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Catch-up credit added after a background period
    OfflineEarnings { amount: f64, symbol: String },

    /// Claim cooldown has run out
    ClaimAvailable,
}

impl Notification {
    /// Snackbar headline
    pub fn message(&self) -> &'static str {
        match self {
            Self::OfflineEarnings { .. } => "Offline Earnings Added",
            Self::ClaimAvailable => "Claim Available",
        }
    }

    /// Snackbar body
    pub fn description(&self) -> String {
        match self {
            Self::OfflineEarnings { amount, symbol } => {
                format!("You earned {:.8} {} while offline", amount, symbol)
            }
            Self::ClaimAvailable => "You can now claim your earnings again!".to_string(),
        }
    }
}

/// Presentation-side sink for notifications
pub trait Notifier: Send + Sync {
    fn show_snackbar(&self, notification: &Notification);
}

/// Writes notifications to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_snackbar(&self, notification: &Notification) {
        tracing::info!(
            message = notification.message(),
            description = %notification.description(),
            "notification"
        );
    }
}

/// Forwards notifications over an unbounded channel
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn show_snackbar(&self, notification: &Notification) {
        if self.tx.send(notification.clone()).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}
