use appsync_core::{NewWorkspaceApp, WorkspaceAppPatch, WorkspacePage};
use appsync_http::{ApiClient, CatalogError, HttpClientConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::{CreatedPage, WorkspaceCatalog};

pub const DEFAULT_API_URL: &str = "https://api.notion.com";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// Largest page size the database query endpoint accepts.
const QUERY_PAGE_SIZE: u32 = 100;

/// Client for a Notion-compatible database API.
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    api: ApiClient,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<WorkspacePage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl WorkspaceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        api_version: &str,
        config: &HttpClientConfig,
    ) -> Result<Self, CatalogError> {
        let api = ApiClient::new(base_url, api_key, &[("notion-version", api_version)], config)?;
        Ok(Self { api })
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl WorkspaceCatalog for WorkspaceClient {
    async fn list_pages(&self, database_id: &str) -> Result<Vec<WorkspacePage>, CatalogError> {
        let path = format!("/v1/databases/{database_id}/query");
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = QueryRequest {
                page_size: QUERY_PAGE_SIZE,
                start_cursor: cursor.as_deref(),
            };
            let response: QueryResponse = self.api.post_json(&path, &request).await?;
            debug!(count = response.results.len(), has_more = response.has_more, "workspace query page");
            pages.extend(response.results);

            match (response.has_more, response.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        for page in pages.iter().filter(|p| p.is_live()) {
            page.validate()?;
        }
        Ok(pages)
    }

    async fn create_page(
        &self,
        database_id: &str,
        app: &NewWorkspaceApp,
    ) -> Result<CreatedPage, CatalogError> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": page_properties(app),
        });
        self.api.post_json("/v1/pages", &body).await
    }

    async fn update_page(
        &self,
        page_id: &str,
        patch: &WorkspaceAppPatch,
    ) -> Result<CreatedPage, CatalogError> {
        let body = json!({ "properties": patch_properties(patch) });
        self.api.patch_json(&format!("/v1/pages/{page_id}"), &body).await
    }
}

fn text(content: &str) -> JsonValue {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// An empty array clears the property; a single empty text run would leave
/// a blank but non-empty value behind.
fn description_property(description: Option<&str>) -> JsonValue {
    match description {
        Some(d) if !d.is_empty() => json!({ "rich_text": text(d) }),
        _ => json!({ "rich_text": [] }),
    }
}

pub fn page_properties(app: &NewWorkspaceApp) -> JsonValue {
    json!({
        "Name": { "title": text(&app.name) },
        "URL": { "url": app.url },
        "State": { "select": { "name": app.state.as_str() } },
        "Description": description_property(app.description.as_deref()),
    })
}

/// Only the properties set on the patch are sent.
pub fn patch_properties(patch: &WorkspaceAppPatch) -> JsonValue {
    let mut properties = Map::new();
    if let Some(url) = &patch.url {
        properties.insert("URL".into(), json!({ "url": url }));
    }
    if let Some(state) = patch.state {
        properties.insert("State".into(), json!({ "select": { "name": state.as_str() } }));
    }
    if let Some(description) = &patch.description {
        properties.insert("Description".into(), description_property(description.as_deref()));
    }
    JsonValue::Object(properties)
}
