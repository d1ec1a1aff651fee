use std::fmt;
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Deserialize};

use crate::navigation::{NavigationSnapshot, Position};

/// Identity of a live viewport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ViewportRole {
    /// Main reading viewport of the regular layout
    Primary,
    /// Side viewport opened next to the primary one; mirrors it, never leads
    Secondary,
    /// Viewport shown in the compact layout
    Alt,
}

impl ViewportRole {
    pub const ALL: [ViewportRole; 3] = [ViewportRole::Primary, ViewportRole::Secondary, ViewportRole::Alt];

    /// Viewport whose position this one mirrors
    pub fn leader(&self) -> Option<ViewportRole> {
        match self {
            ViewportRole::Secondary => Some(ViewportRole::Primary),
            ViewportRole::Primary | ViewportRole::Alt => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewportRole::Primary => "primary",
            ViewportRole::Secondary => "secondary",
            ViewportRole::Alt => "alt",
        }
    }
}

impl fmt::Display for ViewportRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decides which viewport may mutate shared state for the current layout
///
/// Cloning yields a handle to the same layout flag.
#[derive(Debug, Clone, Default)]
pub struct FocusArbiter {
    compact: Arc<RwLock<bool>>,
}

impl FocusArbiter {
    /// Arbiter for the regular layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch layout mode, returning whether it changed
    pub fn set_compact(&self, compact: bool) -> bool {
        let mut current = self.compact.write();
        let changed = *current != compact;
        *current = compact;
        changed
    }

    pub fn is_compact(&self) -> bool {
        *self.compact.read()
    }

    /// The single viewport allowed to write in the current layout
    pub fn authoritative(&self) -> ViewportRole {
        if self.is_compact() {
            ViewportRole::Alt
        } else {
            ViewportRole::Primary
        }
    }

    pub fn is_authoritative(&self, role: ViewportRole) -> bool {
        self.authoritative() == role
    }
}

/// Reading position kept across sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedPosition {
    pub edition: String,
    pub position: Position,
    /// Raw page image index
    pub page_image: u32,
}

impl SavedPosition {
    /// `None` for a snapshot without text
    pub fn from_snapshot(snapshot: &NavigationSnapshot) -> Option<Self> {
        snapshot.position.map(|position| Self {
            edition: snapshot.edition.clone(),
            position,
            page_image: snapshot.page_image,
        })
    }
}

/// Persistence of the last reading position
pub trait ReadingPositionStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<SavedPosition>>;

    fn save(&self, position: &SavedPosition) -> anyhow::Result<()>;

    /// Forget the saved position
    fn reset(&self) -> anyhow::Result<()>;
}

/// Store that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    saved: Mutex<Option<SavedPosition>>,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: SavedPosition) -> Self {
        Self {
            saved: Mutex::new(Some(position)),
        }
    }
}

impl ReadingPositionStore for MemoryPositionStore {
    fn load(&self) -> anyhow::Result<Option<SavedPosition>> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, position: &SavedPosition) -> anyhow::Result<()> {
        *self.saved.lock() = Some(position.clone());
        Ok(())
    }

    fn reset(&self) -> anyhow::Result<()> {
        self.saved.lock().take();
        Ok(())
    }
}
