use buildinfra::notify::{Notifier, Toast, ToastVariant};

/// Renders toasts as cliclack log lines.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, toast: Toast) {
        let _ = match toast.variant {
            ToastVariant::Success => cliclack::log::success(toast.description),
            ToastVariant::Error => cliclack::log::error(toast.description),
        };
    }
}
