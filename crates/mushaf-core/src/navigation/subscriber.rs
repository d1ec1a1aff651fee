//! Navigation subscriber trait

use super::NavigationChange;

/// Trait for components that need to respond to navigation changes
///
/// Called after the state is committed. Updates issued from inside the
/// callback on the same viewport are skipped.
pub trait NavigationSubscriber: Send + Sync {
    fn on_navigation_change(&self, change: &NavigationChange);
}
