use crate::constants::TOAST_LIFETIME_MS;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToastMessage {
    pub text: String,
    pub severity: Severity,
}

struct Toast {
    message: ToastMessage,
    expires_at: Instant,
}

/// Transient status messages. Each toast removes itself once its lifetime
/// has passed; the event loop calls [`ToastNotifier::prune`] every tick.
pub struct ToastNotifier {
    toasts: VecDeque<Toast>,
    lifetime: Duration,
}

impl Default for ToastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastNotifier {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            lifetime: Duration::from_millis(TOAST_LIFETIME_MS),
        }
    }

    pub fn show(&mut self, text: impl Into<String>, severity: Severity) {
        self.show_at(text, severity, Instant::now());
    }

    pub fn show_at(&mut self, text: impl Into<String>, severity: Severity, now: Instant) {
        let text = text.into();
        match severity {
            Severity::Error => tracing::error!(toast = %text),
            Severity::Warning => tracing::warn!(toast = %text),
            Severity::Info | Severity::Success => tracing::info!(toast = %text),
        }
        self.toasts.push_back(Toast {
            message: ToastMessage { text, severity },
            expires_at: now + self.lifetime,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires_at > now);
    }

    /// Live toasts, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &ToastMessage> {
        self.toasts.iter().map(|t| &t.message)
    }

    pub fn latest(&self) -> Option<&ToastMessage> {
        self.toasts.back().map(|t| &t.message)
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
