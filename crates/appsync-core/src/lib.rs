//! Core domain model for appsync: the two catalogs' record shapes and the
//! normalized view the reconciler compares them through.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod inventory;
mod view;
mod workspace;

pub use inventory::{
    AddAppRequest, CreateAppRequest, InventoryApp, KnownApp, UpdateAppRequest,
};
pub use view::{normalize_description, CatalogRecord, CatalogView, ContentDelta};
pub use workspace::{
    NewWorkspaceApp, RichText, RichTextProperty, SelectOption, SelectProperty, TitleProperty,
    UrlProperty, WorkspaceAppPatch, WorkspacePage, WorkspaceProperties,
};

pub const CRATE_NAME: &str = "appsync-core";

/// Lifecycle state of an app. Both catalogs use this vocabulary, but the
/// workspace stores it as a free-text select option, so parsing is lenient
/// about case and surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AppState {
    Discovered,
    Sanctioned,
    Closed,
}

impl AppState {
    pub const ALL: [AppState; 3] = [AppState::Discovered, AppState::Sanctioned, AppState::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Discovered => "Discovered",
            AppState::Sanctioned => "Sanctioned",
            AppState::Closed => "Closed",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown app state {0:?}")]
pub struct UnknownStateError(pub String);

impl FromStr for AppState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        AppState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| UnknownStateError(s.to_string()))
    }
}

impl TryFrom<String> for AppState {
    type Error = UnknownStateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AppState> for String {
    fn from(value: AppState) -> Self {
        value.as_str().to_string()
    }
}

/// Inventory-owned classification. The workspace has no equivalent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppCategory {
    Operations,
    #[serde(rename = "Sales & Marketing")]
    SalesAndMarketing,
    #[serde(rename = "Developer Tools")]
    DeveloperTools,
    Design,
    #[serde(rename = "Project Management")]
    ProjectManagement,
    #[serde(rename = "Customer Success")]
    CustomerSuccess,
    #[serde(rename = "Human Resources")]
    HumanResources,
    #[serde(rename = "IT & Security")]
    ItAndSecurity,
    Finance,
    Productivity,
    #[serde(rename = "Analytics & BI")]
    AnalyticsAndBi,
    Other,
}

impl AppCategory {
    /// Category assigned to custom apps created from workspace pages.
    pub const FALLBACK: AppCategory = AppCategory::Other;

    pub fn as_str(&self) -> &'static str {
        match self {
            AppCategory::Operations => "Operations",
            AppCategory::SalesAndMarketing => "Sales & Marketing",
            AppCategory::DeveloperTools => "Developer Tools",
            AppCategory::Design => "Design",
            AppCategory::ProjectManagement => "Project Management",
            AppCategory::CustomerSuccess => "Customer Success",
            AppCategory::HumanResources => "Human Resources",
            AppCategory::ItAndSecurity => "IT & Security",
            AppCategory::Finance => "Finance",
            AppCategory::Productivity => "Productivity",
            AppCategory::AnalyticsAndBi => "Analytics & BI",
            AppCategory::Other => "Other",
        }
    }
}

impl fmt::Display for AppCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched record that deserialized but cannot take part in a sync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("workspace page {page_id} has an empty Name title")]
    MissingName { page_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_parsing_is_case_and_whitespace_tolerant() {
        assert_eq!("Sanctioned".parse::<AppState>().unwrap(), AppState::Sanctioned);
        assert_eq!(" closed ".parse::<AppState>().unwrap(), AppState::Closed);
        assert_eq!("DISCOVERED".parse::<AppState>().unwrap(), AppState::Discovered);
        assert_eq!(
            "Retired".parse::<AppState>(),
            Err(UnknownStateError("Retired".to_string()))
        );
    }

    #[test]
    fn state_round_trips_through_its_canonical_label() {
        let json = serde_json::to_string(&AppState::Sanctioned).unwrap();
        assert_eq!(json, "\"Sanctioned\"");
        let parsed: AppState = serde_json::from_str("\"sanctioned\"").unwrap();
        assert_eq!(parsed, AppState::Sanctioned);
        assert!(serde_json::from_str::<AppState>("\"Unknown\"").is_err());
    }

    #[test]
    fn category_uses_display_labels_on_the_wire() {
        let json = serde_json::to_string(&AppCategory::ItAndSecurity).unwrap();
        assert_eq!(json, "\"IT & Security\"");
        let parsed: AppCategory = serde_json::from_str("\"Analytics & BI\"").unwrap();
        assert_eq!(parsed, AppCategory::AnalyticsAndBi);
        assert_eq!(AppCategory::FALLBACK.to_string(), "Other");
    }
}
