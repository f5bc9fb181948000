use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppState, RecordError};

/// One row of the workspace apps database, as returned by a database query.
///
/// Only the properties the reconciler reads are modelled; anything else in
/// the page payload is ignored. `URL` and `State` must be set on every row,
/// a row without them fails deserialization and with it the whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePage {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
    #[serde(default)]
    pub url: Option<String>,
    pub properties: WorkspaceProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceProperties {
    #[serde(rename = "Name")]
    pub name: TitleProperty,
    #[serde(rename = "URL")]
    pub url: UrlProperty,
    #[serde(rename = "State")]
    pub state: SelectProperty,
    #[serde(rename = "Description", default)]
    pub description: Option<RichTextProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleProperty {
    #[serde(default)]
    pub id: Option<String>,
    pub title: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlProperty {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectProperty {
    #[serde(default)]
    pub id: Option<String>,
    pub select: SelectOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: AppState,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextProperty {
    #[serde(default)]
    pub id: Option<String>,
    pub rich_text: Vec<RichText>,
}

fn join_plain_text(segments: &[RichText]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}

impl WorkspacePage {
    pub fn name(&self) -> String {
        join_plain_text(&self.properties.name.title)
    }

    pub fn app_url(&self) -> &str {
        &self.properties.url.url
    }

    pub fn state(&self) -> AppState {
        self.properties.state.select.name
    }

    /// Description text, `None` when the property is absent or has no text.
    pub fn description(&self) -> Option<String> {
        self.properties
            .description
            .as_ref()
            .map(|d| join_plain_text(&d.rich_text))
            .filter(|text| !text.is_empty())
    }

    /// Archived and trashed rows are still returned by some queries but are
    /// not live apps.
    pub fn is_live(&self) -> bool {
        !self.archived && !self.in_trash
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.name().trim().is_empty() {
            return Err(RecordError::MissingName {
                page_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// A row to create in the workspace database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewWorkspaceApp {
    pub name: String,
    pub url: String,
    pub state: AppState,
    pub description: Option<String>,
}

/// Property changes for an existing row. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceAppPatch {
    pub url: Option<String>,
    pub state: Option<AppState>,
    pub description: Option<Option<String>>,
}

impl WorkspaceAppPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.state.is_none() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_json(title: &str, description: serde_json::Value) -> serde_json::Value {
        json!({
            "object": "page",
            "id": "5c6a2821-6bb1-4a7e-b6e1-c50111515c3d",
            "created_time": "2024-10-01T08:00:00.000Z",
            "last_edited_time": "2024-10-03T10:15:00.000Z",
            "archived": false,
            "in_trash": false,
            "url": "https://www.notion.so/Slack-5c6a28216bb14a7eb6e1c50111515c3d",
            "properties": {
                "Name": {
                    "id": "title",
                    "type": "title",
                    "title": [
                        { "type": "text", "plain_text": title, "href": null }
                    ]
                },
                "URL": { "id": "u%3Aid", "type": "url", "url": "https://slack.com" },
                "State": {
                    "id": "s%3Aid",
                    "type": "select",
                    "select": { "id": "opt1", "name": "Sanctioned", "color": "green" }
                },
                "Description": description
            }
        })
    }

    #[test]
    fn page_accessors_flatten_the_property_bag() {
        let page: WorkspacePage = serde_json::from_value(page_json(
            "Slack",
            json!({
                "id": "d",
                "type": "rich_text",
                "rich_text": [
                    { "plain_text": "Team ", "href": null },
                    { "plain_text": "chat", "href": null }
                ]
            }),
        ))
        .unwrap();

        assert_eq!(page.name(), "Slack");
        assert_eq!(page.app_url(), "https://slack.com");
        assert_eq!(page.state(), AppState::Sanctioned);
        assert_eq!(page.description().as_deref(), Some("Team chat"));
        assert!(page.is_live());
        assert!(page.validate().is_ok());
    }

    #[test]
    fn empty_rich_text_reads_as_no_description() {
        let page: WorkspacePage = serde_json::from_value(page_json(
            "Slack",
            json!({ "id": "d", "type": "rich_text", "rich_text": [] }),
        ))
        .unwrap();
        assert_eq!(page.description(), None);

        let page: WorkspacePage =
            serde_json::from_value(page_json("Slack", serde_json::Value::Null)).unwrap();
        assert_eq!(page.description(), None);
    }

    #[test]
    fn blank_title_fails_validation() {
        let page: WorkspacePage =
            serde_json::from_value(page_json("  ", serde_json::Value::Null)).unwrap();
        assert_eq!(
            page.validate(),
            Err(RecordError::MissingName {
                page_id: "5c6a2821-6bb1-4a7e-b6e1-c50111515c3d".to_string()
            })
        );
    }

    #[test]
    fn unknown_select_option_is_a_schema_error() {
        let mut value = page_json("Slack", serde_json::Value::Null);
        value["properties"]["State"]["select"]["name"] = json!("Retired");
        assert!(serde_json::from_value::<WorkspacePage>(value).is_err());
    }

    #[test]
    fn patch_emptiness() {
        assert!(WorkspaceAppPatch::default().is_empty());
        let clear = WorkspaceAppPatch {
            description: Some(None),
            ..Default::default()
        };
        assert!(!clear.is_empty());
    }
}
