use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Connected,
    Disconnected,
    ConnectError,
    InitError,
}

impl NotificationKind {
    pub fn is_error(self) -> bool {
        matches!(self, NotificationKind::ConnectError | NotificationKind::InitError)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn connected(device_name: &str) -> Self {
        Self {
            kind: NotificationKind::Connected,
            title: "Connected".to_string(),
            message: format!("Successfully connected to {device_name}"),
        }
    }

    pub fn disconnected(device_name: &str, cause: Option<&str>) -> Self {
        let message = match cause {
            Some(cause) => format!("Lost connection to {device_name}: {cause}"),
            None => format!("Disconnected from {device_name}"),
        };
        Self {
            kind: NotificationKind::Disconnected,
            title: "Disconnected".to_string(),
            message,
        }
    }

    pub fn connect_error(cause: &str) -> Self {
        Self {
            kind: NotificationKind::ConnectError,
            title: "Connection Error".to_string(),
            message: format!("Failed to connect to Smart Ring: {cause}"),
        }
    }

    pub fn init_error(cause: &str) -> Self {
        Self {
            kind: NotificationKind::InitError,
            title: "Bluetooth Error".to_string(),
            message: format!("Failed to initialize Bluetooth: {cause}"),
        }
    }
}

/// Receives lifecycle outcomes. Delivery must not block the monitor.
pub trait Notifier: Send {
    fn notify(&mut self, notification: Notification);
}

impl Notifier for mpsc::UnboundedSender<Notification> {
    fn notify(&mut self, notification: Notification) {
        // A closed receiver just means nobody is displaying toasts anymore.
        let _ = self.send(notification);
    }
}

impl<F> Notifier for F
where
    F: FnMut(Notification) + Send,
{
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}
