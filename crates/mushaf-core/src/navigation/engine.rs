//! Navigation engine implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::state::Resolution;
use super::{
    NavigationChange, NavigationRequest, NavigationSnapshot, NavigationState,
    NavigationSubscriber, Position, SkipReason, UpdateOutcome,
};
use crate::partition::{PageSpread, Partition, PartitionTables, PositionResolver};
use crate::sync::{FocusArbiter, ViewportRole};
use crate::NavigationError;

/// Reentrancy guard, held for the whole update call
struct PropagationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PropagationGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PropagationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Navigation state of one viewport and the only path that mutates it
///
/// Cloning yields another handle to the same viewport.
#[derive(Clone)]
pub struct Navigator {
    role: ViewportRole,
    resolver: Arc<PositionResolver>,
    arbiter: FocusArbiter,
    state: Arc<RwLock<NavigationState>>,
    propagating: Arc<AtomicBool>,
    subscribers: Arc<RwLock<Vec<Weak<dyn NavigationSubscriber>>>>,
}

impl Navigator {
    /// Create a viewport seeded from a persisted position
    ///
    /// An invalid or missing seed starts at the first verse of the book.
    pub fn new(
        role: ViewportRole,
        resolver: Arc<PositionResolver>,
        arbiter: FocusArbiter,
        seed: Option<Position>,
    ) -> Result<Self, NavigationError> {
        let tables = resolver.tables()?;
        let state = seed
            .and_then(|position| NavigationState::from_position(&tables, position))
            .or_else(|| NavigationState::from_position(&tables, Position::FIRST))
            .ok_or_else(|| {
                NavigationError::InvalidEditionState(format!(
                    "edition '{}' has no page for {}",
                    tables.pages().edition(),
                    Position::FIRST
                ))
            })?;

        Ok(Self {
            role,
            resolver,
            arbiter,
            state: Arc::new(RwLock::new(state)),
            propagating: Arc::new(AtomicBool::new(false)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn role(&self) -> ViewportRole {
        self.role
    }

    /// Apply one edit and bring every partition index in line with it
    ///
    /// A no-op on a viewport that is not authoritative for the current layout,
    /// and on a call made while another update of this viewport is running.
    pub fn update(&self, request: NavigationRequest) -> Result<UpdateOutcome, NavigationError> {
        if let Some(skipped) = self.skip_if_hidden() {
            return Ok(skipped);
        }
        self.propagate(request)
    }

    /// Re-derive all indices from the current position, regardless of focus
    pub(crate) fn reproject(&self) -> Result<UpdateOutcome, NavigationError> {
        self.commit(NavigationRequest::Refresh, |state, tables| state.reproject(tables))
    }

    /// Take over another viewport's position and page, regardless of focus
    pub(crate) fn reseed(&self, snapshot: &NavigationSnapshot) -> Result<UpdateOutcome, NavigationError> {
        let request = snapshot
            .position
            .map_or(NavigationRequest::PageImage(snapshot.page_image), NavigationRequest::Position);
        self.commit(request, |state, tables| {
            state.resolve_seed(tables, snapshot.position, snapshot.page_image)
        })
    }

    /// Move one display page forward
    pub fn next_page(&self) -> Result<UpdateOutcome, NavigationError> {
        self.step_page(1)
    }

    /// Move one display page back
    pub fn previous_page(&self) -> Result<UpdateOutcome, NavigationError> {
        self.step_page(-1)
    }

    fn step_page(&self, delta: i32) -> Result<UpdateOutcome, NavigationError> {
        if let Some(skipped) = self.skip_if_hidden() {
            return Ok(skipped);
        }
        let tables = self.resolver.tables()?;
        let page = tables.pages().display_page(self.state.read().indices().page);
        self.propagate(NavigationRequest::Page(page.saturating_add(delta)))
    }

    /// Move to the next verse of the chapter, back to verse 1 when `wrap` is set
    pub fn next_verse(&self, wrap: bool) -> Result<UpdateOutcome, NavigationError> {
        if let Some(skipped) = self.skip_if_hidden() {
            return Ok(skipped);
        }
        let tables = self.resolver.tables()?;
        let Some(position) = self.current_position() else {
            return Ok(UpdateOutcome::Skipped(SkipReason::NoVerse));
        };
        let length = tables.canonical().chapter_length(position.chapter).unwrap_or(0);
        if position.verse < length {
            self.propagate(NavigationRequest::Verse(position.verse + 1))
        } else if wrap {
            self.propagate(NavigationRequest::Verse(1))
        } else {
            Ok(UpdateOutcome::Skipped(SkipReason::EndOfChapter))
        }
    }

    /// Move to the previous verse of the chapter
    pub fn previous_verse(&self) -> Result<UpdateOutcome, NavigationError> {
        if let Some(skipped) = self.skip_if_hidden() {
            return Ok(skipped);
        }
        let Some(position) = self.current_position() else {
            return Ok(UpdateOutcome::Skipped(SkipReason::NoVerse));
        };
        if position.verse > 1 {
            self.propagate(NavigationRequest::Verse(position.verse - 1))
        } else {
            Ok(UpdateOutcome::Skipped(SkipReason::StartOfChapter))
        }
    }

    fn skip_if_hidden(&self) -> Option<UpdateOutcome> {
        if self.arbiter.is_authoritative(self.role) {
            return None;
        }
        trace!("Skipping update on hidden {} viewport", self.role);
        Some(UpdateOutcome::Skipped(SkipReason::NotAuthoritative))
    }

    fn propagate(&self, request: NavigationRequest) -> Result<UpdateOutcome, NavigationError> {
        self.commit(request, |state, tables| state.resolve(tables, request))
    }

    /// Resolve, write the state once and notify, all under the guard
    fn commit<F>(&self, request: NavigationRequest, resolve: F) -> Result<UpdateOutcome, NavigationError>
    where
        F: FnOnce(&NavigationState, &PartitionTables) -> Resolution,
    {
        let Some(guard) = PropagationGuard::engage(&self.propagating) else {
            trace!("Skipping reentrant {:?} on {} viewport", request, self.role);
            return Ok(UpdateOutcome::Skipped(SkipReason::Reentrant));
        };

        let tables = self.resolver.tables()?;
        let resolution = resolve(&*self.state.read(), &tables);
        let (state, outcome) = match resolution {
            Resolution::Content(state) => (state, UpdateOutcome::Applied),
            Resolution::NoContent(state) => (state, UpdateOutcome::NoContent),
        };

        // Single commit of the resolved state
        *self.state.write() = state.clone();

        let snapshot = self.snapshot_of(&tables, &state);
        debug!(
            "{} viewport: {:?} (source {}) -> {} page {} ({})",
            self.role,
            request,
            request.source().map_or("none", |partition| partition.name()),
            snapshot
                .position
                .map_or_else(|| "no text".to_string(), |position| position.to_string()),
            snapshot.page,
            snapshot.page_image
        );

        let change = match outcome {
            UpdateOutcome::NoContent => NavigationChange::NoContent(snapshot),
            _ => NavigationChange::PositionChanged(snapshot),
        };
        self.notify_subscribers(&change);

        // Released only after notification so subscribers cannot re-enter
        drop(guard);
        Ok(outcome)
    }

    /// Current segment of `partition`; the chapter is `None` on pages without text
    pub fn current(&self, partition: Partition) -> Option<u32> {
        self.state.read().current(partition)
    }

    pub fn current_position(&self) -> Option<Position> {
        self.state.read().position()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> Result<NavigationSnapshot, NavigationError> {
        let tables = self.resolver.tables()?;
        let state = self.state.read().clone();
        Ok(self.snapshot_of(&tables, &state))
    }

    /// Raw pages to show for the current page
    pub fn spread(&self, dual_page: bool) -> Result<PageSpread, NavigationError> {
        let tables = self.resolver.tables()?;
        let page = self.state.read().indices().page;
        Ok(tables.pages().spread(page, dual_page))
    }

    fn snapshot_of(&self, tables: &PartitionTables, state: &NavigationState) -> NavigationSnapshot {
        let indices = *state.indices();
        let position = state.position();
        NavigationSnapshot {
            viewport: self.role,
            edition: tables.pages().edition().to_string(),
            position,
            page_image: indices.page,
            page: tables.pages().display_page(indices.page),
            indices,
            chapter_length: position
                .and_then(|position| tables.canonical().chapter_length(position.chapter)),
        }
    }

    /// Add a subscriber
    pub fn add_subscriber(&self, subscriber: Arc<dyn NavigationSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(&subscriber));
    }

    /// Notify all live subscribers once
    fn notify_subscribers(&self, change: &NavigationChange) {
        let live: Vec<Arc<dyn NavigationSubscriber>> = {
            let mut subscribers = self.subscribers.write();

            // Remove any dead weak references
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            subscriber.on_navigation_change(change);
        }
    }
}
