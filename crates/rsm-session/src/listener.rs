//! Notification hook for session invalidation.
//!
//! The host container decides what "notify listeners" means (calling
//! servlet listeners, emitting metrics, clearing a login cache). This
//! crate only defines the [`SessionListener`] trait and calls it from
//! [`Session::expire`](crate::Session::expire) when asked to notify.

/// Receives session lifecycle notifications.
///
/// # Trait bounds
///
/// - `Send + Sync` → listeners are shared by every session the manager
///   hands out, on any tokio worker thread.
/// - `'static` → a listener lives as long as the manager.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use rsm_session::SessionListener;
///
/// /// Counts invalidated sessions.
/// #[derive(Default)]
/// struct ExpiryCounter(AtomicUsize);
///
/// impl SessionListener for ExpiryCounter {
///     fn session_expired(&self, _session_id: &str) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait SessionListener: Send + Sync + 'static {
    /// Called once when a session is invalidated with notification on.
    ///
    /// Runs synchronously inside `expire`; keep it short.
    fn session_expired(&self, session_id: &str);
}
