use std::sync::Arc;
use parking_lot::RwLock;
use ahash::AHashMap;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::events::events::{
    EditionLoaded, EditionUnavailable, LayoutModeChanged, ReadingPositionSaved, ViewportClosed,
    ViewportOpened,
};
use crate::events::EventBus;
use crate::metadata::EditionMetadataProvider;
use crate::navigation::{
    NavigationChange, NavigationRequest, NavigationSubscriber, Navigator, UpdateOutcome,
};
use crate::partition::{PageSpread, PositionResolver};
use crate::sync::{FocusArbiter, ReadingPositionStore, SavedPosition, ViewportRole};
use crate::NavigationError;

pub const DEFAULT_EDITION: &str = "madinah";

/// Reader settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderSettings {
    /// Print edition to load
    pub edition: String,

    /// Compact layout, where the alt viewport leads
    pub compact: bool,

    /// Show two facing pages
    pub dual_page: bool,

    /// Verse stepping wraps to the first verse of the chapter
    pub playback_loop: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            edition: DEFAULT_EDITION.to_string(),
            compact: false,
            dual_page: false,
            playback_loop: false,
        }
    }
}

impl ReaderSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Saves the authoritative viewport's position after every change
struct PositionPersistence {
    arbiter: FocusArbiter,
    store: Arc<dyn ReadingPositionStore>,
    event_bus: Arc<EventBus>,
}

impl NavigationSubscriber for PositionPersistence {
    fn on_navigation_change(&self, change: &NavigationChange) {
        let snapshot = change.snapshot();
        if !self.arbiter.is_authoritative(snapshot.viewport) {
            return;
        }

        let saved = SavedPosition::from_snapshot(snapshot);
        let result = match (change, &saved) {
            (NavigationChange::PositionChanged(_), Some(saved)) => self.store.save(saved),
            _ => self.store.reset(),
        };
        if let Err(err) = result {
            warn!("Failed to persist reading position: {:#}", err);
            return;
        }

        self.event_bus.publish(ReadingPositionSaved {
            position: saved.map(|saved| saved.position),
        });
    }
}

/// Moves a viewport along with the one it mirrors
struct ViewportFollower {
    follower: Navigator,
}

impl NavigationSubscriber for ViewportFollower {
    fn on_navigation_change(&self, change: &NavigationChange) {
        if let Err(err) = self.follower.reseed(change.snapshot()) {
            warn!("{} viewport failed to follow: {}", self.follower.role(), err);
        }
    }
}

/// The reader: the tables, every open viewport and the shared layout state
pub struct ReaderSession {
    resolver: Arc<PositionResolver>,
    arbiter: FocusArbiter,
    editions: Arc<dyn EditionMetadataProvider>,
    store: Arc<dyn ReadingPositionStore>,
    event_bus: Arc<EventBus>,
    settings: RwLock<ReaderSettings>,
    viewports: RwLock<AHashMap<ViewportRole, Navigator>>,
    /// Follower subscriptions by follower role
    followers: RwLock<AHashMap<ViewportRole, Arc<ViewportFollower>>>,
    persistence: Arc<PositionPersistence>,
}

impl ReaderSession {
    /// Create a session; no edition is loaded and no viewport is open yet
    pub fn new(
        resolver: Arc<PositionResolver>,
        editions: Arc<dyn EditionMetadataProvider>,
        store: Arc<dyn ReadingPositionStore>,
        settings: ReaderSettings,
    ) -> Self {
        let arbiter = FocusArbiter::new();
        arbiter.set_compact(settings.compact);
        let event_bus = Arc::new(EventBus::new());
        let persistence = Arc::new(PositionPersistence {
            arbiter: arbiter.clone(),
            store: store.clone(),
            event_bus: event_bus.clone(),
        });

        Self {
            resolver,
            arbiter,
            editions,
            store,
            event_bus,
            settings: RwLock::new(settings),
            viewports: RwLock::new(AHashMap::new()),
            followers: RwLock::new(AHashMap::new()),
            persistence,
        }
    }

    /// Load the configured edition and open the authoritative viewport
    pub fn start(&self) -> Result<Navigator, NavigationError> {
        let edition = self.settings.read().edition.clone();
        self.load_edition(&edition)?;
        self.open_viewport(self.arbiter.authoritative())
    }

    pub fn resolver(&self) -> &Arc<PositionResolver> {
        &self.resolver
    }

    pub fn arbiter(&self) -> &FocusArbiter {
        &self.arbiter
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn settings(&self) -> ReaderSettings {
        self.settings.read().clone()
    }

    pub fn set_dual_page(&self, dual_page: bool) {
        self.settings.write().dual_page = dual_page;
    }

    pub fn set_playback_loop(&self, playback_loop: bool) {
        self.settings.write().playback_loop = playback_loop;
    }

    /// Editions the provider can load
    pub fn installed_editions(&self) -> Result<Vec<String>, NavigationError> {
        Ok(self.editions.installed_editions()?)
    }

    /// Swap the page table and reproject every open viewport
    ///
    /// On failure the previously loaded table stays in place.
    pub fn load_edition(&self, edition: &str) -> Result<(), NavigationError> {
        let Some(metadata) = self.editions.edition_metadata(edition)? else {
            warn!("Edition '{}' is not installed", edition);
            self.event_bus.publish(EditionUnavailable {
                edition: edition.to_string(),
                reason: "not installed".to_string(),
            });
            return Err(NavigationError::EditionNotInstalled(edition.to_string()));
        };

        let pages = match self.resolver.build_page_table(metadata) {
            Ok(pages) => pages,
            Err(err) => {
                warn!("Rejected page table of edition '{}': {}", edition, err);
                self.event_bus.publish(EditionUnavailable {
                    edition: edition.to_string(),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let loaded = EditionLoaded {
            edition: pages.edition().to_string(),
            page_count: pages.page_count(),
            start_offset: pages.start_offset(),
        };
        self.resolver.install_edition(pages);
        self.settings.write().edition = loaded.edition.clone();
        self.event_bus.publish(loaded);

        for navigator in self.open_viewports() {
            navigator.reproject()?;
        }
        Ok(())
    }

    /// Open a viewport, or return it when already open
    ///
    /// A new viewport starts at the persisted position, or the first verse.
    pub fn open_viewport(&self, role: ViewportRole) -> Result<Navigator, NavigationError> {
        if let Some(navigator) = self.viewport(role) {
            return Ok(navigator);
        }

        let seed = match self.store.load() {
            Ok(saved) => saved.map(|saved| saved.position),
            Err(err) => {
                warn!("Failed to load reading position: {:#}", err);
                None
            }
        };
        let navigator = Navigator::new(role, self.resolver.clone(), self.arbiter.clone(), seed)?;
        navigator.add_subscriber(self.persistence.clone());

        let navigator = self
            .viewports
            .write()
            .entry(role)
            .or_insert(navigator)
            .clone();
        info!("Opened {} viewport", role);
        self.event_bus.publish(ViewportOpened { role });

        for follower in ViewportRole::ALL {
            if follower == role || follower.leader() == Some(role) {
                self.link_follower(follower)?;
            }
        }
        Ok(navigator)
    }

    /// Subscribe an open follower to its open leader and move it to the leader's position
    fn link_follower(&self, role: ViewportRole) -> Result<(), NavigationError> {
        let Some(leader_role) = role.leader() else {
            return Ok(());
        };
        let (Some(follower), Some(leader)) = (self.viewport(role), self.viewport(leader_role)) else {
            return Ok(());
        };
        if self.followers.read().contains_key(&role) {
            return Ok(());
        }

        let link = Arc::new(ViewportFollower {
            follower: follower.clone(),
        });
        leader.add_subscriber(link.clone());
        self.followers.write().insert(role, link);
        debug!("{} viewport follows {} viewport", role, leader_role);
        follower.reseed(&leader.snapshot()?)?;
        Ok(())
    }

    /// Close a viewport, returning whether it was open
    pub fn close_viewport(&self, role: ViewportRole) -> bool {
        let closed = self.viewports.write().remove(&role).is_some();
        self.followers
            .write()
            .retain(|follower, _| *follower != role && follower.leader() != Some(role));
        if closed {
            info!("Closed {} viewport", role);
            self.event_bus.publish(ViewportClosed { role });
        }
        closed
    }

    pub fn viewport(&self, role: ViewportRole) -> Option<Navigator> {
        self.viewports.read().get(&role).cloned()
    }

    fn open_viewports(&self) -> Vec<Navigator> {
        self.viewports.read().values().cloned().collect()
    }

    fn require(&self, role: ViewportRole) -> Result<Navigator, NavigationError> {
        self.viewport(role).ok_or(NavigationError::ViewportNotOpen(role))
    }

    /// Apply an edit on one viewport
    pub fn update(
        &self,
        role: ViewportRole,
        request: NavigationRequest,
    ) -> Result<UpdateOutcome, NavigationError> {
        self.require(role)?.update(request)
    }

    /// Step one verse forward, wrapping when playback loops
    pub fn next_verse(&self, role: ViewportRole) -> Result<UpdateOutcome, NavigationError> {
        let wrap = self.settings.read().playback_loop;
        self.require(role)?.next_verse(wrap)
    }

    /// Raw pages the viewport shows in the configured page mode
    pub fn spread(&self, role: ViewportRole) -> Result<PageSpread, NavigationError> {
        let dual_page = self.settings.read().dual_page;
        self.require(role)?.spread(dual_page)
    }

    /// Switch layout mode, carrying the reading position to the new leader
    pub fn set_compact(&self, compact: bool) -> Result<bool, NavigationError> {
        let previous = self.arbiter.authoritative();
        if !self.arbiter.set_compact(compact) {
            return Ok(false);
        }
        self.settings.write().compact = compact;
        let current = self.arbiter.authoritative();
        info!(
            "Layout switched to {}, {} viewport leads",
            if compact { "compact" } else { "regular" },
            current
        );
        self.event_bus.publish(LayoutModeChanged {
            compact,
            authoritative: current,
        });

        if let (Some(from), Some(to)) = (self.viewport(previous), self.viewport(current)) {
            let snapshot = from.snapshot()?;
            to.reseed(&snapshot)?;
        }
        Ok(true)
    }

    /// Persist the authoritative viewport's position now
    pub fn save(&self) -> Result<Option<SavedPosition>, NavigationError> {
        let Some(navigator) = self.viewport(self.arbiter.authoritative()) else {
            return Ok(None);
        };
        let saved = SavedPosition::from_snapshot(&navigator.snapshot()?);
        match &saved {
            Some(saved) => self.store.save(saved)?,
            None => self.store.reset()?,
        }
        self.event_bus.publish(ReadingPositionSaved {
            position: saved.as_ref().map(|saved| saved.position),
        });
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::metadata::EditionMetadata;
    use crate::navigation::Position;
    use crate::partition::Partition;
    use crate::sync::MemoryPositionStore;
    use crate::SkipReason;
    use parking_lot::Mutex;

    /// Fixture edition, a copy with four front-matter pages less and one with a continued verse
    struct FixtureEditions;

    fn shifted_edition() -> EditionMetadata {
        let mut metadata = fixtures::edition_metadata();
        metadata.id = "shifted".to_string();
        metadata.page_count -= 4;
        for (raw, _) in metadata.first_verses.iter_mut() {
            *raw -= 4;
        }
        metadata
    }

    impl EditionMetadataProvider for FixtureEditions {
        fn edition_metadata(&self, edition: &str) -> anyhow::Result<Option<EditionMetadata>> {
            Ok(match edition {
                fixtures::EDITION => Some(fixtures::edition_metadata()),
                "shifted" => Some(shifted_edition()),
                "continued" => Some(fixtures::continued_edition_metadata()),
                "broken" => Some(EditionMetadata {
                    id: "broken".to_string(),
                    page_count: 0,
                    first_verses: Vec::new(),
                }),
                _ => None,
            })
        }

        fn installed_editions(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec![fixtures::EDITION.to_string(), "shifted".to_string()])
        }
    }

    fn session_with(store: Arc<MemoryPositionStore>, settings: ReaderSettings) -> ReaderSession {
        let resolver = Arc::new(PositionResolver::new(fixtures::canonical_tables()));
        ReaderSession::new(resolver, Arc::new(FixtureEditions), store, settings)
    }

    fn session() -> (ReaderSession, Arc<MemoryPositionStore>) {
        let store = Arc::new(MemoryPositionStore::new());
        let session = session_with(store.clone(), fixtures::settings());
        session.start().unwrap();
        (session, store)
    }

    #[test]
    fn test_settings_defaults_from_partial_json() {
        let settings = ReaderSettings::from_json(r#"{ "dual_page": true }"#).unwrap();
        assert_eq!(settings.edition, DEFAULT_EDITION);
        assert!(settings.dual_page);
        assert!(!settings.compact);

        let json = settings.to_json().unwrap();
        assert_eq!(ReaderSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_start_opens_authoritative_viewport() {
        let (session, store) = session();
        let primary = session.viewport(ViewportRole::Primary).unwrap();
        assert_eq!(primary.current_position(), Some(Position::FIRST));
        assert!(session.viewport(ViewportRole::Alt).is_none());
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(
            session.installed_editions().unwrap(),
            vec![fixtures::EDITION.to_string(), "shifted".to_string()]
        );
    }

    #[test]
    fn test_viewport_seeded_from_store() {
        let store = Arc::new(MemoryPositionStore::with_position(SavedPosition {
            edition: fixtures::EDITION.to_string(),
            position: Position::new(36, 1),
            page_image: 1,
        }));
        let session = session_with(store, fixtures::settings());
        let navigator = session.start().unwrap();
        assert_eq!(navigator.current_position(), Some(Position::new(36, 1)));
        assert_eq!(navigator.current(Partition::Chapter), Some(36));
    }

    #[test]
    fn test_only_authoritative_changes_are_saved() {
        let (session, store) = session();
        session.open_viewport(ViewportRole::Alt).unwrap();
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        session
            .event_bus()
            .subscribe_fn(move |event: &ReadingPositionSaved| sink.lock().push(event.position));

        session
            .update(ViewportRole::Primary, NavigationRequest::Chapter(2))
            .unwrap();
        assert_eq!(store.load().unwrap().map(|s| s.position), Some(Position::new(2, 1)));

        let outcome = session
            .update(ViewportRole::Alt, NavigationRequest::Chapter(9))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Skipped(SkipReason::NotAuthoritative));
        assert_eq!(store.load().unwrap().map(|s| s.position), Some(Position::new(2, 1)));

        session
            .update(ViewportRole::Primary, NavigationRequest::PageImage(2))
            .unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(*saved.lock(), vec![Some(Position::new(2, 1)), None]);
    }

    #[test]
    fn test_layout_switch_reseeds_new_leader() {
        let (session, store) = session();
        let alt = session.open_viewport(ViewportRole::Alt).unwrap();
        session
            .update(ViewportRole::Primary, NavigationRequest::Position(Position::new(18, 10)))
            .unwrap();
        assert_eq!(alt.current_position(), Some(Position::FIRST));

        assert!(session.set_compact(true).unwrap());
        assert!(!session.set_compact(true).unwrap());
        assert!(session.settings().compact);
        assert_eq!(alt.current_position(), Some(Position::new(18, 10)));

        session.update(ViewportRole::Alt, NavigationRequest::Verse(20)).unwrap();
        assert_eq!(store.load().unwrap().map(|s| s.position), Some(Position::new(18, 20)));
        assert_eq!(
            session
                .update(ViewportRole::Primary, NavigationRequest::Chapter(1))
                .unwrap(),
            UpdateOutcome::Skipped(SkipReason::NotAuthoritative)
        );
    }

    #[test]
    fn test_layout_switch_carries_front_matter_page() {
        let (session, _) = session();
        let alt = session.open_viewport(ViewportRole::Alt).unwrap();
        session
            .update(ViewportRole::Primary, NavigationRequest::PageImage(4))
            .unwrap();

        session.set_compact(true).unwrap();
        assert_eq!(alt.current_position(), None);
        assert_eq!(alt.current(Partition::Page), Some(4));
    }

    #[test]
    fn test_edition_switch_reprojects_pages() {
        let (session, _) = session();
        let loaded = Arc::new(Mutex::new(Vec::new()));
        let sink = loaded.clone();
        session
            .event_bus()
            .subscribe_fn(move |event: &EditionLoaded| sink.lock().push(event.clone()));

        let primary = session.viewport(ViewportRole::Primary).unwrap();
        primary.update(NavigationRequest::Chapter(2)).unwrap();
        assert_eq!(primary.current(Partition::Page), Some(8));

        session.load_edition("shifted").unwrap();
        let snapshot = primary.snapshot().unwrap();
        assert_eq!(snapshot.edition, "shifted");
        assert_eq!(snapshot.position, Some(Position::new(2, 1)));
        assert_eq!(snapshot.page_image, 4);
        assert_eq!(snapshot.page, 2);
        assert_eq!(session.settings().edition, "shifted");
        assert_eq!(
            *loaded.lock(),
            vec![EditionLoaded {
                edition: "shifted".to_string(),
                page_count: fixtures::PAGE_COUNT - 4,
                start_offset: 3,
            }]
        );
    }

    #[test]
    fn test_unavailable_edition_keeps_current_table() {
        let (session, _) = session();
        let unavailable = Arc::new(Mutex::new(Vec::new()));
        let sink = unavailable.clone();
        session
            .event_bus()
            .subscribe_fn(move |event: &EditionUnavailable| sink.lock().push(event.edition.clone()));

        assert!(matches!(
            session.load_edition("warsh"),
            Err(NavigationError::EditionNotInstalled(id)) if id == "warsh"
        ));
        assert!(matches!(
            session.load_edition("broken"),
            Err(NavigationError::InvalidEditionState(_))
        ));
        assert_eq!(session.resolver().edition().as_deref(), Some(fixtures::EDITION));
        assert_eq!(session.settings().edition, fixtures::EDITION);
        assert_eq!(*unavailable.lock(), vec!["warsh".to_string(), "broken".to_string()]);
    }

    #[test]
    fn test_closed_viewport_rejects_updates() {
        let (session, _) = session();
        assert!(matches!(
            session.update(ViewportRole::Secondary, NavigationRequest::Refresh),
            Err(NavigationError::ViewportNotOpen(ViewportRole::Secondary))
        ));

        session.open_viewport(ViewportRole::Secondary).unwrap();
        assert!(session.close_viewport(ViewportRole::Secondary));
        assert!(!session.close_viewport(ViewportRole::Secondary));
        assert!(session.viewport(ViewportRole::Secondary).is_none());
    }

    #[test]
    fn test_secondary_mirrors_primary() {
        let (session, store) = session();
        session
            .update(ViewportRole::Primary, NavigationRequest::Chapter(4))
            .unwrap();
        let secondary = session.open_viewport(ViewportRole::Secondary).unwrap();
        assert_eq!(secondary.current_position(), Some(Position::new(4, 1)));

        session
            .update(ViewportRole::Primary, NavigationRequest::Chapter(5))
            .unwrap();
        assert_eq!(secondary.current_position(), Some(Position::new(5, 1)));
        assert_eq!(
            secondary.snapshot().unwrap().indices,
            session.viewport(ViewportRole::Primary).unwrap().snapshot().unwrap().indices
        );
        assert_eq!(
            session
                .update(ViewportRole::Secondary, NavigationRequest::Chapter(6))
                .unwrap(),
            UpdateOutcome::Skipped(SkipReason::NotAuthoritative)
        );

        session
            .update(ViewportRole::Primary, NavigationRequest::PageImage(3))
            .unwrap();
        assert_eq!(secondary.current_position(), None);
        assert_eq!(secondary.current(Partition::Page), Some(3));
        assert_eq!(store.load().unwrap(), None);

        assert!(session.close_viewport(ViewportRole::Secondary));
        session
            .update(ViewportRole::Primary, NavigationRequest::Chapter(9))
            .unwrap();
        assert_eq!(secondary.current_position(), None);
    }

    #[test]
    fn test_secondary_linked_when_primary_opens_later() {
        let store = Arc::new(MemoryPositionStore::new());
        let session = session_with(store, fixtures::settings());
        session.load_edition(fixtures::EDITION).unwrap();
        let secondary = session.open_viewport(ViewportRole::Secondary).unwrap();
        let primary = session.open_viewport(ViewportRole::Primary).unwrap();

        primary.update(NavigationRequest::Position(Position::new(18, 10))).unwrap();
        assert_eq!(secondary.current_position(), Some(Position::new(18, 10)));
    }

    #[test]
    fn test_continuation_page_is_saved() {
        let (session, store) = session();
        session.load_edition("continued").unwrap();
        let primary = session.viewport(ViewportRole::Primary).unwrap();

        primary.update(NavigationRequest::PageImage(8)).unwrap();
        assert_eq!(primary.next_page().unwrap(), UpdateOutcome::Applied);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.position, Position::new(2, 1));
        assert_eq!(saved.page_image, 9);
    }

    #[test]
    fn test_spread_and_playback_follow_settings() {
        let (session, _) = session();
        session
            .update(ViewportRole::Primary, NavigationRequest::PageImage(9))
            .unwrap();
        assert_eq!(
            session.spread(ViewportRole::Primary).unwrap(),
            PageSpread { first: Some(9), second: None }
        );
        session.set_dual_page(true);
        assert_eq!(
            session.spread(ViewportRole::Primary).unwrap(),
            PageSpread { first: Some(8), second: Some(9) }
        );

        session
            .update(ViewportRole::Primary, NavigationRequest::Position(Position::new(1, 7)))
            .unwrap();
        assert_eq!(
            session.next_verse(ViewportRole::Primary).unwrap(),
            UpdateOutcome::Skipped(SkipReason::EndOfChapter)
        );
        session.set_playback_loop(true);
        session.next_verse(ViewportRole::Primary).unwrap();
        assert_eq!(
            session.viewport(ViewportRole::Primary).unwrap().current_position(),
            Some(Position::FIRST)
        );
    }

    #[test]
    fn test_explicit_save() {
        let (session, store) = session();
        store.reset().unwrap();
        let saved = session.save().unwrap().unwrap();
        assert_eq!(saved.position, Position::FIRST);
        assert_eq!(saved.page_image, 7);
        assert_eq!(store.load().unwrap(), Some(saved));
    }
}
