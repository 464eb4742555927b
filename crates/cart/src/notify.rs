//! User-facing notifications.
//!
//! The engine reports every rejected operation through a [`Notifier`] with
//! one of the fixed strings in [`messages`]. Delivery is fire-and-forget.

/// Exact notification strings shown to the user.
pub mod messages {
    pub const STOCK_EXCEEDED: &str = "requested quantity exceeds stock";
    pub const ADD_FAILED: &str = "failed to add product";
    pub const REMOVE_FAILED: &str = "failed to remove product";
    pub const UPDATE_FAILED: &str = "failed to change product quantity";
}

/// Sink for human-readable error messages.
pub trait Notifier {
    /// Show an error message to the user.
    fn error(&self, message: &str);
}

/// Emits notifications as `warn` events on the `notification` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(target: "notification", "{message}");
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
