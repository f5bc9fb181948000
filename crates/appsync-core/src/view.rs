use chrono::{DateTime, Utc};

use crate::{AppState, InventoryApp, WorkspaceAppPatch, WorkspacePage};

/// Side-independent view of an app record, used only for matching and
/// comparison. Writes always go back through the native record types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub name: String,
    pub url: String,
    pub state: AppState,
    pub description: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// Empty text and a missing description mean the same thing on both sides.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description.filter(|d| !d.is_empty()).map(str::to_string)
}

/// The mutable fields of `source` that differ from the matched target record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDelta {
    pub url: Option<String>,
    pub state: Option<AppState>,
    pub description: Option<Option<String>>,
}

impl ContentDelta {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.state.is_none() && self.description.is_none()
    }
}

impl CatalogView {
    /// Description, state and url all match exactly.
    pub fn same_content(&self, other: &CatalogView) -> bool {
        self.description == other.description && self.state == other.state && self.url == other.url
    }

    pub fn delta_to(&self, target: &CatalogView) -> ContentDelta {
        ContentDelta {
            url: (self.url != target.url).then(|| self.url.clone()),
            state: (self.state != target.state).then_some(self.state),
            description: (self.description != target.description)
                .then(|| self.description.clone()),
        }
    }
}

pub trait CatalogRecord {
    fn view(&self) -> CatalogView;

    fn name_key(&self) -> String;

    fn last_modified(&self) -> DateTime<Utc>;
}

impl CatalogRecord for WorkspacePage {
    fn view(&self) -> CatalogView {
        CatalogView {
            name: self.name(),
            url: self.app_url().to_string(),
            state: self.state(),
            description: self.description(),
            last_modified: self.last_edited_time,
        }
    }

    fn name_key(&self) -> String {
        self.name()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_edited_time
    }
}

impl CatalogRecord for InventoryApp {
    fn view(&self) -> CatalogView {
        CatalogView {
            name: self.name.clone(),
            url: self.url.clone(),
            state: self.state,
            description: normalize_description(self.description.as_deref()),
            last_modified: self.last_updated_at,
        }
    }

    fn name_key(&self) -> String {
        self.name.clone()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_updated_at
    }
}

impl From<ContentDelta> for WorkspaceAppPatch {
    fn from(delta: ContentDelta) -> Self {
        WorkspaceAppPatch {
            url: delta.url,
            state: delta.state,
            description: delta.description,
        }
    }
}
