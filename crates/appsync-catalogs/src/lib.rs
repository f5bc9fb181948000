//! Catalog contracts plus the HTTP and in-memory implementations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use appsync_core::{
    CreateAppRequest, InventoryApp, KnownApp, NewWorkspaceApp, UpdateAppRequest,
    WorkspaceAppPatch, WorkspacePage,
};
use appsync_http::CatalogError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod inventory;
pub mod memory;
pub mod workspace;

pub use inventory::InventoryClient;
pub use memory::{FixtureSnapshot, InMemoryInventory, InMemoryWorkspace, InventoryCall, WorkspaceCall};
pub use workspace::WorkspaceClient;

pub const CRATE_NAME: &str = "appsync-catalogs";

/// What the workspace API echoes back after a page write. Only the id is
/// relied on; the full page is not re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait]
pub trait WorkspaceCatalog: Send + Sync {
    /// Every page in the database, archived ones included. Live pages are
    /// validated before they are returned.
    async fn list_pages(&self, database_id: &str) -> Result<Vec<WorkspacePage>, CatalogError>;

    async fn create_page(
        &self,
        database_id: &str,
        app: &NewWorkspaceApp,
    ) -> Result<CreatedPage, CatalogError>;

    async fn update_page(
        &self,
        page_id: &str,
        patch: &WorkspaceAppPatch,
    ) -> Result<CreatedPage, CatalogError>;
}

#[async_trait]
pub trait InventoryCatalog: Send + Sync {
    async fn list_apps(&self) -> Result<Vec<InventoryApp>, CatalogError>;

    async fn list_known_apps(&self) -> Result<Vec<KnownApp>, CatalogError>;

    async fn add_known_app(&self, id: u64) -> Result<InventoryApp, CatalogError>;

    async fn create_custom_app(&self, body: &CreateAppRequest) -> Result<InventoryApp, CatalogError>;

    async fn update_app(&self, id: u64, body: &UpdateAppRequest)
        -> Result<InventoryApp, CatalogError>;

    async fn delete_app(&self, id: u64) -> Result<(), CatalogError>;

    async fn get_app(&self, id: u64) -> Result<InventoryApp, CatalogError>;

    /// Apps whose name contains `query` (case-sensitive, server-side).
    async fn search_apps(&self, query: &str) -> Result<Vec<InventoryApp>, CatalogError>;
}

fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}
