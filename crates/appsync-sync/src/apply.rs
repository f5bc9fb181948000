//! Writers for each direction. Every item is attempted independently; a
//! failed call is recorded in the batch and the loop moves on.

use appsync_catalogs::{InventoryCatalog, WorkspaceCatalog};
use appsync_core::{
    normalize_description, AppCategory, CatalogRecord, CreateAppRequest, InventoryApp, KnownApp,
    NewWorkspaceApp, UpdateAppRequest, WorkspaceAppPatch, WorkspacePage,
};

use crate::index::NameIndex;
use crate::report::{BatchKind, BatchReport, Direction, ItemAction};

/// Body for a workspace page the inventory's known catalog does not cover.
pub fn custom_app_request(page: &WorkspacePage) -> CreateAppRequest {
    CreateAppRequest {
        name: page.name(),
        url: page.app_url().to_string(),
        state: page.state(),
        category: AppCategory::FALLBACK,
        description: Some(page.description().unwrap_or_default()),
        tags: None,
    }
}

/// The inventory replaces description and tags on every update, so the body
/// carries the page's full content and echoes the app's current tags. Name
/// and category are left out and keep their inventory values.
pub fn inventory_update_request(page: &WorkspacePage, app: &InventoryApp) -> UpdateAppRequest {
    UpdateAppRequest {
        url: Some(page.app_url().to_string()),
        state: Some(page.state()),
        description: Some(page.description().unwrap_or_default()),
        tags: app.tags.clone(),
        ..Default::default()
    }
}

pub fn new_workspace_app(app: &InventoryApp) -> NewWorkspaceApp {
    NewWorkspaceApp {
        name: app.name.clone(),
        url: app.url.clone(),
        state: app.state,
        description: normalize_description(app.description.as_deref()),
    }
}

/// Known apps are added by id; anything else becomes a custom app.
pub async fn add_to_inventory<I>(
    inventory: &I,
    known: &NameIndex<KnownApp>,
    missing: &[&WorkspacePage],
) -> BatchReport
where
    I: InventoryCatalog + ?Sized,
{
    let mut batch = BatchReport::new(Direction::WorkspaceToInventory, BatchKind::Add);
    for page in missing {
        let name = page.name();
        let result = match known.get(&name) {
            Some(known_app) => inventory
                .add_known_app(known_app.id)
                .await
                .map(|_| ItemAction::AddedKnownApp),
            None => inventory
                .create_custom_app(&custom_app_request(page))
                .await
                .map(|_| ItemAction::CreatedCustomApp),
        };
        batch.record(name, result);
    }
    batch
}

pub async fn update_inventory<I>(
    inventory: &I,
    targets: &NameIndex<InventoryApp>,
    stale: &[&WorkspacePage],
) -> BatchReport
where
    I: InventoryCatalog + ?Sized,
{
    let mut batch = BatchReport::new(Direction::WorkspaceToInventory, BatchKind::Update);
    for page in stale {
        let name = page.name();
        let Some(app) = targets.get(&name) else {
            batch.fail(name, "no inventory app with this name");
            continue;
        };

        // A write on either side bumps its timestamp, so newer does not
        // imply different.
        if page.view().same_content(&app.view()) {
            batch.unchanged(name);
            continue;
        }

        let result = inventory
            .update_app(app.id, &inventory_update_request(page, app))
            .await
            .map(|_| ItemAction::UpdatedApp);
        batch.record(name, result);
    }
    batch
}

pub async fn add_to_workspace<W>(
    workspace: &W,
    database_id: &str,
    missing: &[&InventoryApp],
) -> BatchReport
where
    W: WorkspaceCatalog + ?Sized,
{
    let mut batch = BatchReport::new(Direction::InventoryToWorkspace, BatchKind::Add);
    for app in missing {
        let result = workspace
            .create_page(database_id, &new_workspace_app(app))
            .await
            .map(|_| ItemAction::CreatedPage);
        batch.record(app.name.clone(), result);
    }
    batch
}

/// Category and tags stay in the inventory; only url, state and
/// description are written back.
pub async fn update_workspace<W>(
    workspace: &W,
    targets: &NameIndex<WorkspacePage>,
    stale: &[&InventoryApp],
) -> BatchReport
where
    W: WorkspaceCatalog + ?Sized,
{
    let mut batch = BatchReport::new(Direction::InventoryToWorkspace, BatchKind::Update);
    for app in stale {
        let name = app.name.clone();
        let Some(page) = targets.get(&name) else {
            batch.fail(name, "no workspace page with this name");
            continue;
        };

        let delta = app.view().delta_to(&page.view());
        if delta.is_empty() {
            batch.unchanged(name);
            continue;
        }

        let result = workspace
            .update_page(&page.id, &WorkspaceAppPatch::from(delta))
            .await
            .map(|_| ItemAction::UpdatedPage);
        batch.record(name, result);
    }
    batch
}
