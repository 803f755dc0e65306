//! Client-side controllers for the TrueFeedback screens.
//!
//! Each controller owns its form state and talks to the API through a small
//! trait, so a UI layer only renders state and forwards input. Navigation and
//! toast notifications are injected through [`Navigator`] and [`Notifier`].

pub mod api;
pub mod errors;
pub mod fallback;
pub mod sign_in;
pub mod sign_up;
pub mod validation;

pub use api::ApiClient;
pub use errors::AppError;

/// Route changes requested by a controller.
pub trait Navigator: Send + Sync {
    /// Navigate to `path`, replacing the current history entry.
    fn replace(&self, path: &str);
}

/// Toast-style user notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, title: &str);
    fn error(&self, title: &str);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Navigator, Notifier};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub paths: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn replace(&self, path: &str) {
            if let Ok(mut paths) = self.paths.lock() {
                paths.push(path.to_string());
            }
        }
    }

    impl RecordingNavigator {
        pub(crate) fn paths(&self) -> Vec<String> {
            self.paths.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Toast {
        Success(String),
        Error(String),
    }

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub toasts: Mutex<Vec<Toast>>,
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, title: &str) {
            if let Ok(mut toasts) = self.toasts.lock() {
                toasts.push(Toast::Success(title.to_string()));
            }
        }

        fn error(&self, title: &str) {
            if let Ok(mut toasts) = self.toasts.lock() {
                toasts.push(Toast::Error(title.to_string()));
            }
        }
    }

    impl RecordingNotifier {
        pub(crate) fn toasts(&self) -> Vec<Toast> {
            self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
        }
    }
}
