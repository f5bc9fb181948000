//! In-process catalogs backed by plain vectors. They behave like the remote
//! APIs closely enough to drive a full sync offline, record every write they
//! receive, and can be told to fail for chosen app names.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use appsync_core::{
    AppState, CreateAppRequest, InventoryApp, KnownApp, NewWorkspaceApp, RichText,
    RichTextProperty, SelectOption, SelectProperty, TitleProperty, UpdateAppRequest, UrlProperty,
    WorkspaceAppPatch, WorkspacePage, WorkspaceProperties,
};
use appsync_http::CatalogError;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{read_json_file, CreatedPage, InventoryCatalog, WorkspaceCatalog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceCall {
    Create {
        database_id: String,
        app: NewWorkspaceApp,
    },
    Update {
        page_id: String,
        patch: WorkspaceAppPatch,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryCall {
    AddKnown(u64),
    CreateCustom(CreateAppRequest),
    Update { id: u64, body: UpdateAppRequest },
    Delete(u64),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn rejected(status: u16, url: String, body: impl Into<String>) -> CatalogError {
    CatalogError::HttpStatus {
        status,
        url,
        body: body.into(),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkspace {
    pages: Mutex<Vec<WorkspacePage>>,
    calls: Mutex<Vec<WorkspaceCall>>,
    failing_names: HashSet<String>,
    fail_listing: bool,
}

impl InMemoryWorkspace {
    pub fn new(pages: Vec<WorkspacePage>) -> Self {
        Self {
            pages: Mutex::new(pages),
            ..Default::default()
        }
    }

    /// Writes touching an app with this name are rejected with a 400.
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failing_names.insert(name.into());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn pages(&self) -> Vec<WorkspacePage> {
        lock(&self.pages).clone()
    }

    pub fn calls(&self) -> Vec<WorkspaceCall> {
        lock(&self.calls).clone()
    }
}

fn rich_text(content: &str) -> Vec<RichText> {
    if content.is_empty() {
        return Vec::new();
    }
    vec![RichText {
        plain_text: content.to_string(),
        href: None,
    }]
}

fn new_page(id: String, app: &NewWorkspaceApp) -> WorkspacePage {
    let now = Utc::now();
    WorkspacePage {
        id,
        created_time: now,
        last_edited_time: now,
        archived: false,
        in_trash: false,
        url: None,
        properties: WorkspaceProperties {
            name: TitleProperty {
                id: None,
                title: rich_text(&app.name),
            },
            url: UrlProperty {
                id: None,
                url: app.url.clone(),
            },
            state: SelectProperty {
                id: None,
                select: SelectOption {
                    id: None,
                    name: app.state,
                    color: None,
                },
            },
            description: Some(RichTextProperty {
                id: None,
                rich_text: rich_text(app.description.as_deref().unwrap_or_default()),
            }),
        },
    }
}

#[async_trait]
impl WorkspaceCatalog for InMemoryWorkspace {
    async fn list_pages(&self, database_id: &str) -> Result<Vec<WorkspacePage>, CatalogError> {
        if self.fail_listing {
            return Err(rejected(
                503,
                format!("memory://workspace/{database_id}"),
                "listing disabled",
            ));
        }
        let pages = self.pages();
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
        lock(&self.calls).push(WorkspaceCall::Create {
            database_id: database_id.to_string(),
            app: app.clone(),
        });
        if self.failing_names.contains(&app.name) {
            return Err(rejected(400, "memory://workspace/pages".into(), "rejected"));
        }

        let id = Uuid::new_v4().simple().to_string();
        lock(&self.pages).push(new_page(id.clone(), app));
        Ok(CreatedPage { id, url: None })
    }

    async fn update_page(
        &self,
        page_id: &str,
        patch: &WorkspaceAppPatch,
    ) -> Result<CreatedPage, CatalogError> {
        lock(&self.calls).push(WorkspaceCall::Update {
            page_id: page_id.to_string(),
            patch: patch.clone(),
        });
        let url = format!("memory://workspace/pages/{page_id}");

        let mut pages = lock(&self.pages);
        let page = pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or_else(|| rejected(404, url.clone(), "page not found"))?;
        if self.failing_names.contains(&page.name()) {
            return Err(rejected(400, url, "rejected"));
        }

        if let Some(new_url) = &patch.url {
            page.properties.url.url = new_url.clone();
        }
        if let Some(state) = patch.state {
            page.properties.state.select.name = state;
        }
        if let Some(description) = &patch.description {
            page.properties.description = Some(RichTextProperty {
                id: None,
                rich_text: rich_text(description.as_deref().unwrap_or_default()),
            });
        }
        page.last_edited_time = Utc::now();
        Ok(CreatedPage {
            id: page.id.clone(),
            url: page.url.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct InventoryState {
    apps: Vec<InventoryApp>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryInventory {
    state: Mutex<InventoryState>,
    known: Vec<KnownApp>,
    calls: Mutex<Vec<InventoryCall>>,
    failing_names: HashSet<String>,
    fail_listing: bool,
}

/// Custom app ids start here so they never collide with the known catalog.
const FIRST_CUSTOM_ID: u64 = 10_000;

impl InMemoryInventory {
    pub fn new(apps: Vec<InventoryApp>, known: Vec<KnownApp>) -> Self {
        let next_id = apps
            .iter()
            .map(|a| a.id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_ID)
            .max(FIRST_CUSTOM_ID);
        Self {
            state: Mutex::new(InventoryState { apps, next_id }),
            known,
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failing_names.insert(name.into());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn apps(&self) -> Vec<InventoryApp> {
        lock(&self.state).apps.clone()
    }

    pub fn calls(&self) -> Vec<InventoryCall> {
        lock(&self.calls).clone()
    }

    fn insert(&self, mut app: InventoryApp) -> Result<InventoryApp, CatalogError> {
        let mut state = lock(&self.state);
        if state.apps.iter().any(|a| a.name == app.name) {
            return Err(rejected(
                409,
                "memory://inventory/apps".into(),
                format!("app {} already exists", app.name),
            ));
        }
        if app.id == 0 {
            app.id = state.next_id;
            state.next_id += 1;
        }
        state.apps.push(app.clone());
        Ok(app)
    }
}

fn fresh_app(id: u64, name: String, url: String, state: AppState) -> InventoryApp {
    let now = Utc::now();
    InventoryApp {
        id,
        is_hidden: false,
        name,
        state,
        url,
        image_url: None,
        category: appsync_core::AppCategory::FALLBACK,
        users: None,
        description: None,
        tags: None,
        creation_time: now,
        last_updated_at: now,
        last_usage_time: None,
        added_by: "appsync".to_string(),
        primary_owner: "appsync".to_string(),
        is_custom: false,
        sources: None,
    }
}

#[async_trait]
impl InventoryCatalog for InMemoryInventory {
    async fn list_apps(&self) -> Result<Vec<InventoryApp>, CatalogError> {
        if self.fail_listing {
            return Err(rejected(503, "memory://inventory/apps".into(), "listing disabled"));
        }
        Ok(self.apps())
    }

    async fn list_known_apps(&self) -> Result<Vec<KnownApp>, CatalogError> {
        Ok(self.known.clone())
    }

    async fn add_known_app(&self, id: u64) -> Result<InventoryApp, CatalogError> {
        lock(&self.calls).push(InventoryCall::AddKnown(id));
        let known = self
            .known
            .iter()
            .find(|k| k.id == id)
            .ok_or_else(|| rejected(404, "memory://inventory/apps".into(), format!("no known app {id}")))?;
        if self.failing_names.contains(&known.name) {
            return Err(rejected(400, "memory://inventory/apps".into(), "rejected"));
        }

        let mut app = fresh_app(known.id, known.name.clone(), known.url.clone(), AppState::Discovered);
        app.category = known.category;
        self.insert(app)
    }

    async fn create_custom_app(&self, body: &CreateAppRequest) -> Result<InventoryApp, CatalogError> {
        lock(&self.calls).push(InventoryCall::CreateCustom(body.clone()));
        if self.failing_names.contains(&body.name) {
            return Err(rejected(400, "memory://inventory/apps/custom".into(), "rejected"));
        }

        let mut app = fresh_app(0, body.name.clone(), body.url.clone(), body.state);
        app.category = body.category;
        app.description = body.description.clone();
        app.tags = body.tags.clone();
        app.is_custom = true;
        self.insert(app)
    }

    async fn update_app(
        &self,
        id: u64,
        body: &UpdateAppRequest,
    ) -> Result<InventoryApp, CatalogError> {
        lock(&self.calls).push(InventoryCall::Update {
            id,
            body: body.clone(),
        });
        let url = format!("memory://inventory/apps/{id}");

        let mut state = lock(&self.state);
        let app = state
            .apps
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| rejected(404, url.clone(), "app not found"))?;
        if self.failing_names.contains(&app.name) {
            return Err(rejected(400, url, "rejected"));
        }

        if let Some(name) = &body.name {
            app.name = name.clone();
        }
        if let Some(new_url) = &body.url {
            app.url = new_url.clone();
        }
        if let Some(new_state) = body.state {
            app.state = new_state;
        }
        if let Some(category) = body.category {
            app.category = category;
        }
        // replaced even when absent from the body
        app.description = body.description.clone();
        app.tags = body.tags.clone();
        app.last_updated_at = Utc::now();
        Ok(app.clone())
    }

    async fn delete_app(&self, id: u64) -> Result<(), CatalogError> {
        lock(&self.calls).push(InventoryCall::Delete(id));
        let mut state = lock(&self.state);
        let before = state.apps.len();
        state.apps.retain(|a| a.id != id);
        if state.apps.len() == before {
            return Err(rejected(404, format!("memory://inventory/apps/{id}"), "app not found"));
        }
        Ok(())
    }

    async fn get_app(&self, id: u64) -> Result<InventoryApp, CatalogError> {
        self.apps()
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| rejected(404, format!("memory://inventory/apps/{id}"), "app not found"))
    }

    async fn search_apps(&self, query: &str) -> Result<Vec<InventoryApp>, CatalogError> {
        Ok(self
            .apps()
            .into_iter()
            .filter(|a| a.name.contains(query))
            .collect())
    }
}

/// Offline copy of both catalogs, as stored on disk for `plan --fixtures`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureSnapshot {
    #[serde(default)]
    pub database_id: String,
    #[serde(default)]
    pub workspace_pages: Vec<WorkspacePage>,
    #[serde(default)]
    pub inventory_apps: Vec<InventoryApp>,
    #[serde(default)]
    pub known_apps: Vec<KnownApp>,
}

impl FixtureSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json_file(path)
    }

    pub fn into_catalogs(self) -> (InMemoryWorkspace, InMemoryInventory) {
        (
            InMemoryWorkspace::new(self.workspace_pages),
            InMemoryInventory::new(self.inventory_apps, self.known_apps),
        )
    }
}
