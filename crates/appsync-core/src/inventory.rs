use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppCategory, AppState};

/// App record as returned by the inventory's `/v1.0/apps` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryApp {
    pub id: u64,
    #[serde(default)]
    pub is_hidden: bool,
    pub name: String,
    pub state: AppState,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: AppCategory,
    #[serde(default)]
    pub users: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    pub creation_time: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_usage_time: Option<DateTime<Utc>>,
    pub added_by: String,
    pub primary_owner: String,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub sources: Option<String>,
}

/// Reference app the inventory can add by id without a custom definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownApp {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub category: AppCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAppRequest {
    #[serde(rename = "idApp")]
    pub id_app: u64,
}

/// Body for creating a custom app. `tags` is always sent, as `null` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub url: String,
    pub state: AppState,
    pub category: AppCategory,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// Update body. Unset name, url, state and category are left out and keep
/// their remote value; `description` and `tags` are always sent, because the
/// inventory replaces both on every update (`null` clears them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAppRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<AppState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<AppCategory>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl UpdateAppRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.state.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.tags.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inventory_app_parses_camel_case_payload() {
        let app: InventoryApp = serde_json::from_value(json!({
            "id": 1002,
            "isHidden": false,
            "name": "GitHub",
            "state": "Sanctioned",
            "url": "https://github.com",
            "imageUrl": null,
            "category": "Developer Tools",
            "description": "Code hosting",
            "tags": null,
            "creationTime": "2024-10-01T08:00:00Z",
            "lastUpdatedAt": "2024-10-02T09:30:00Z",
            "lastUsageTime": null,
            "addedBy": "ops@example.com",
            "primaryOwner": "eng@example.com",
            "isCustom": false
        }))
        .unwrap();

        assert_eq!(app.id, 1002);
        assert_eq!(app.category, AppCategory::DeveloperTools);
        assert_eq!(app.description.as_deref(), Some("Code hosting"));
        assert_eq!(app.last_updated_at.to_rfc3339(), "2024-10-02T09:30:00+00:00");
        assert!(app.sources.is_none());
    }

    #[test]
    fn inventory_app_rejects_unknown_category() {
        let result = serde_json::from_value::<InventoryApp>(json!({
            "id": 1,
            "name": "X",
            "state": "Closed",
            "url": "https://x",
            "category": "Astrology",
            "creationTime": "2024-10-01T08:00:00Z",
            "lastUpdatedAt": "2024-10-01T08:00:00Z",
            "addedBy": "a",
            "primaryOwner": "b"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn create_request_sends_null_tags() {
        let body = CreateAppRequest {
            name: "Foo".into(),
            url: "https://foo".into(),
            state: AppState::Discovered,
            category: AppCategory::FALLBACK,
            description: Some(String::new()),
            tags: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "name": "Foo",
                "url": "https://foo",
                "state": "Discovered",
                "category": "Other",
                "description": "",
                "tags": null
            })
        );
    }

    #[test]
    fn update_request_omits_unset_fields_but_not_replaced_ones() {
        let body = UpdateAppRequest {
            state: Some(AppState::Closed),
            ..Default::default()
        };
        assert!(!body.is_empty());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "state": "Closed", "description": null, "tags": null })
        );
        assert!(UpdateAppRequest::default().is_empty());
    }

    #[test]
    fn add_request_uses_id_app_key() {
        let body = AddAppRequest { id_app: 1000 };
        assert_eq!(serde_json::to_value(body).unwrap(), json!({ "idApp": 1000 }));
    }
}
