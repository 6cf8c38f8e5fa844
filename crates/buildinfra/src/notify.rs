use std::sync::Mutex;
use tracing::{error, info};

use crate::errors::InfraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Success,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub variant: ToastVariant,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn success<S: Into<String>>(description: S) -> Self {
        Self {
            variant: ToastVariant::Success,
            title: "Success".to_string(),
            description: description.into(),
        }
    }

    pub fn error<S: Into<String>>(description: S) -> Self {
        Self {
            variant: ToastVariant::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Reports a failed call to the user and to the log.
pub fn show_error(notifier: &dyn Notifier, err: &InfraError) {
    error!("Error: {}", err);
    notifier.notify(Toast::error(err.user_message()));
}

/// Writes toasts to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Success => info!(title = %toast.title, "{}", toast.description),
            ToastVariant::Error => error!(title = %toast.title, "{}", toast.description),
        }
    }
}

/// Keeps every toast for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|toasts| toasts.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_show_error_uses_user_message() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(Toast::error("Profile small does not exist")))
            .times(1)
            .return_const(());

        show_error(&notifier, &InfraError::NotFound("small".to_string()));
    }

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Toast::success("saved"));
        notifier.notify(Toast::error("failed"));

        assert_eq!(notifier.toasts().len(), 2);
        assert_eq!(notifier.last().unwrap().variant, ToastVariant::Error);
    }
}
