use appsync_core::{AddAppRequest, CreateAppRequest, InventoryApp, KnownApp, UpdateAppRequest};
use appsync_http::{ApiClient, CatalogError, HttpClientConfig};
use async_trait::async_trait;

use crate::InventoryCatalog;

pub const DEFAULT_API_URL: &str = "http://localhost:9000";

/// Client for the inventory's `/v1.0` REST API.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    api: ApiClient,
}

impl InventoryClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        config: &HttpClientConfig,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            api: ApiClient::new(base_url, api_key, &[], config)?,
        })
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl InventoryCatalog for InventoryClient {
    async fn list_apps(&self) -> Result<Vec<InventoryApp>, CatalogError> {
        self.api.get_json("/v1.0/apps").await
    }

    async fn list_known_apps(&self) -> Result<Vec<KnownApp>, CatalogError> {
        self.api.get_json("/v1.0/apps/known").await
    }

    async fn add_known_app(&self, id: u64) -> Result<InventoryApp, CatalogError> {
        self.api
            .post_json("/v1.0/apps", &AddAppRequest { id_app: id })
            .await
    }

    async fn create_custom_app(&self, body: &CreateAppRequest) -> Result<InventoryApp, CatalogError> {
        self.api.post_json("/v1.0/apps/custom", body).await
    }

    async fn update_app(
        &self,
        id: u64,
        body: &UpdateAppRequest,
    ) -> Result<InventoryApp, CatalogError> {
        self.api.put_json(&format!("/v1.0/apps/{id}"), body).await
    }

    async fn delete_app(&self, id: u64) -> Result<(), CatalogError> {
        self.api.delete(&format!("/v1.0/apps/{id}")).await
    }

    async fn get_app(&self, id: u64) -> Result<InventoryApp, CatalogError> {
        self.api.get_json(&format!("/v1.0/apps/{id}")).await
    }

    async fn search_apps(&self, query: &str) -> Result<Vec<InventoryApp>, CatalogError> {
        self.api
            .get_json_query("/v1.0/apps/search", &[("query", query)])
            .await
    }
}
