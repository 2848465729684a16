//! Change notification for editable vault items
//!
//! Every mutable field of a [`VaultItem`](crate::item::VaultItem) publishes a
//! [`PropertyChange`] through a shared [`ChangeNotifier`]. Front-ends subscribe
//! to mark items dirty or refresh their views.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Change published to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyChange {
    Name,
    Enabled,
    Expires,
    NotBefore,
    Value,
    Tags(TagChange),
}

/// Tag collection change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagChange {
    Added(String),
    Updated(String),
    Removed(String),
    Cleared,
}

impl PropertyChange {
    /// Field name as shown to users
    pub fn property_name(&self) -> &'static str {
        match self {
            PropertyChange::Name => "Name",
            PropertyChange::Enabled => "Enabled",
            PropertyChange::Expires => "Expires",
            PropertyChange::NotBefore => "NotBefore",
            PropertyChange::Value => "Value",
            PropertyChange::Tags(_) => "Tags",
        }
    }
}

impl fmt::Display for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyChange::Tags(TagChange::Added(name)) => write!(f, "Tags (added '{name}')"),
            PropertyChange::Tags(TagChange::Updated(name)) => write!(f, "Tags (updated '{name}')"),
            PropertyChange::Tags(TagChange::Removed(name)) => write!(f, "Tags (removed '{name}')"),
            PropertyChange::Tags(TagChange::Cleared) => write!(f, "Tags (cleared)"),
            other => f.write_str(other.property_name()),
        }
    }
}

/// Listener callback
pub type ChangeListener = Arc<dyn Fn(&PropertyChange) + Send + Sync>;

/// Handle returned by [`ChangeNotifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct NotifierState {
    next_id: u64,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
}

/// Shared change bus. Clones publish to the same listeners and revision.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    state: Arc<Mutex<NotifierState>>,
    revision: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; listeners run in subscription order
    pub fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let mut state = self.lock_state();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, listener));
        id
    }

    /// Remove a listener, returning whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock_state();
        let before = state.listeners.len();
        state.listeners.retain(|(existing, _)| *existing != id);
        state.listeners.len() != before
    }

    /// Bump the revision and invoke every listener
    pub fn notify(&self, change: PropertyChange) {
        self.revision.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("property changed: {}", change);

        // Snapshot so listeners may subscribe/unsubscribe re-entrantly
        let listeners: Vec<ChangeListener> = self
            .lock_state()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&change);
        }
    }

    /// Number of notifications published so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.lock_state().listeners.len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, NotifierState> {
        // A panicking listener never runs while the lock is held
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (ChangeListener, Arc<Mutex<Vec<PropertyChange>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: ChangeListener = Arc::new(move |change: &PropertyChange| {
            sink.lock().unwrap().push(change.clone());
        });
        (listener, seen)
    }

    #[test]
    fn test_notify_reaches_all_listeners_and_bumps_revision() {
        let notifier = ChangeNotifier::new();
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();
        notifier.subscribe(first);
        notifier.subscribe(second);

        notifier.notify(PropertyChange::Enabled);
        notifier.notify(PropertyChange::Value);

        assert_eq!(notifier.revision(), 2);
        assert_eq!(
            *first_seen.lock().unwrap(),
            vec![PropertyChange::Enabled, PropertyChange::Value]
        );
        assert_eq!(first_seen.lock().unwrap().len(), second_seen.lock().unwrap().len());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = ChangeNotifier::new();
        let (listener, seen) = recorder();
        let id = notifier.subscribe(listener);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(PropertyChange::Expires);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(notifier.revision(), 1);
    }

    #[test]
    fn test_clones_share_listeners() {
        let notifier = ChangeNotifier::new();
        let (listener, seen) = recorder();
        notifier.subscribe(listener);

        let clone = notifier.clone();
        clone.notify(PropertyChange::Tags(TagChange::Cleared));

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(notifier.revision(), 1);
    }

    #[test]
    fn test_display_names_tag_changes() {
        let change = PropertyChange::Tags(TagChange::Added("env".to_string()));
        assert_eq!(change.to_string(), "Tags (added 'env')");
        assert_eq!(PropertyChange::NotBefore.to_string(), "NotBefore");
    }
}
