//! Reconciliation pipeline between the workspace database and the app
//! inventory: fetch both sides, diff by name, push adds and updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use appsync_catalogs::{
    FixtureSnapshot, InventoryCatalog, InventoryClient, WorkspaceCatalog, WorkspaceClient,
};
use chrono::Utc;
use tokio::fs;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub mod apply;
pub mod config;
pub mod diff;
pub mod index;
pub mod report;

pub use config::{ConfigFile, SyncConfig};
pub use diff::{diff, missing, stale_in, DiffResult};
pub use index::{build_index, index_inventory, index_known, index_workspace, NameIndex};
pub use report::{BatchKind, BatchReport, Direction, ItemAction, ItemOutcome, ItemResult, SyncReport};

pub const CRATE_NAME: &str = "appsync-sync";

pub struct SyncPipeline<W, I> {
    config: SyncConfig,
    database_id: String,
    workspace: W,
    inventory: I,
}

impl SyncPipeline<WorkspaceClient, InventoryClient> {
    /// Build HTTP clients for both catalogs from `config`.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let http = config.http_client_config();
        let workspace = WorkspaceClient::new(
            config.workspace_api_url.clone(),
            config.workspace_api_key()?,
            &config.workspace_api_version,
            &http,
        )
        .context("building workspace client")?;
        let inventory = InventoryClient::new(
            config.inventory_api_url.clone(),
            config.inventory_api_key()?,
            &http,
        )
        .context("building inventory client")?;
        Self::with_catalogs(config, workspace, inventory)
    }
}

impl<W, I> SyncPipeline<W, I>
where
    W: WorkspaceCatalog,
    I: InventoryCatalog,
{
    pub fn with_catalogs(config: SyncConfig, workspace: W, inventory: I) -> Result<Self> {
        let database_id = config.database_id()?.to_string();
        Ok(Self {
            config,
            database_id,
            workspace,
            inventory,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// One full pass. Item failures are reported, not returned; only a
    /// failed fetch (or report write) is an error.
    pub async fn run_once(&self) -> Result<SyncReport> {
        let mut report = self.reconcile(false).await?;
        if let Some(root) = &self.config.reports_dir {
            self.write_report(root, &mut report).await?;
        }
        info!(
            run_id = %report.run_id,
            applied = report.applied(),
            unchanged = report.unchanged(),
            failed = report.failed(),
            "sync finished"
        );
        Ok(report)
    }

    /// Run the pass against an in-memory copy of both catalogs, leaving the
    /// real ones untouched.
    pub async fn plan(&self) -> Result<SyncReport> {
        let (workspace, inventory) = self.fetch_snapshot().await?.into_catalogs();
        let shadow = SyncPipeline {
            config: self.config.clone(),
            database_id: self.database_id.clone(),
            workspace,
            inventory,
        };
        shadow.reconcile(true).await
    }

    /// Full listings of both catalogs, plus the known-app catalog when
    /// pushing into the inventory.
    pub async fn fetch_snapshot(&self) -> Result<FixtureSnapshot> {
        let workspace_pages = self
            .workspace
            .list_pages(&self.database_id)
            .await
            .context("listing workspace pages")?;
        let inventory_apps = self
            .inventory
            .list_apps()
            .await
            .context("listing inventory apps")?;
        let known_apps = if self.config.push_to_inventory {
            self.inventory
                .list_known_apps()
                .await
                .context("listing known inventory apps")?
        } else {
            Vec::new()
        };

        Ok(FixtureSnapshot {
            database_id: self.database_id.clone(),
            workspace_pages,
            inventory_apps,
            known_apps,
        })
    }

    async fn reconcile(&self, dry_run: bool) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id, dry_run);
        self.reconcile_run(run_id, dry_run).instrument(span).await
    }

    async fn reconcile_run(&self, run_id: Uuid, dry_run: bool) -> Result<SyncReport> {
        let started_at = Utc::now();
        let snapshot = self.fetch_snapshot().await?;
        let workspace_pages = snapshot.workspace_pages.len();
        let inventory_apps = snapshot.inventory_apps.len();
        info!(workspace_pages, inventory_apps, "fetched both catalogs");

        let pages = index_workspace(snapshot.workspace_pages);
        let apps = index_inventory(snapshot.inventory_apps);
        let known = index_known(snapshot.known_apps);

        let to_inventory = info_span!("diff", direction = %Direction::WorkspaceToInventory)
            .in_scope(|| diff(&pages, &apps));
        let to_workspace = info_span!("diff", direction = %Direction::InventoryToWorkspace)
            .in_scope(|| diff(&apps, &pages));

        let push_inventory = self.config.push_to_inventory;
        let push_workspace = self.config.push_to_workspace;
        let mut batches = Vec::new();

        if push_inventory {
            batches.push(apply::add_to_inventory(&self.inventory, &known, &to_inventory.missing).await);
        }
        if push_workspace {
            batches.push(
                apply::add_to_workspace(&self.workspace, &self.database_id, &to_workspace.missing)
                    .await,
            );
        }
        if push_inventory {
            batches.push(apply::update_inventory(&self.inventory, &apps, &to_inventory.stale).await);
        }
        if push_workspace {
            batches.push(apply::update_workspace(&self.workspace, &pages, &to_workspace.stale).await);
        }

        Ok(SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run,
            workspace_pages,
            inventory_apps,
            batches,
            report_path: None,
        })
    }

    async fn write_report(&self, root: &Path, report: &mut SyncReport) -> Result<PathBuf> {
        let dir = root.join(report.run_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let path = dir.join("sync_report.json");
        report.report_path = Some(path.display().to_string());
        let bytes = serde_json::to_vec_pretty(&*report).context("serializing sync report")?;
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Scheduler that runs `pipeline` on every tick of the configured cron
/// expression. The caller starts and shuts it down.
pub async fn build_scheduler<W, I>(pipeline: Arc<SyncPipeline<W, I>>) -> Result<JobScheduler>
where
    W: WorkspaceCatalog + 'static,
    I: InventoryCatalog + 'static,
{
    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = pipeline.config.sync_cron.clone();
    let job = Job::new_async(&cron, move |_uuid, _l| {
        let pipeline = Arc::clone(&pipeline);
        Box::pin(async move {
            if let Err(err) = pipeline.run_once().await {
                error!(error = %format!("{err:#}"), "scheduled sync aborted");
            }
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))?;
    sched.add(job).await.context("adding scheduler job")?;
    Ok(sched)
}

pub async fn run_sync_once_from_env() -> Result<SyncReport> {
    let pipeline = SyncPipeline::new(SyncConfig::from_env())?;
    pipeline.run_once().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use appsync_catalogs::{InMemoryInventory, InMemoryWorkspace, InventoryCall, WorkspaceCall};
    use appsync_core::{AppCategory, AppState, CreateAppRequest, UpdateAppRequest};

    type MemoryPipeline = SyncPipeline<InMemoryWorkspace, InMemoryInventory>;

    fn snapshot() -> FixtureSnapshot {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/snapshot.json");
        FixtureSnapshot::load(path).expect("fixture snapshot")
    }

    fn config_for(snapshot: &FixtureSnapshot) -> SyncConfig {
        SyncConfig {
            workspace_database_id: Some(snapshot.database_id.clone()),
            ..SyncConfig::default()
        }
    }

    fn pipeline_with(config: SyncConfig, snapshot: FixtureSnapshot) -> MemoryPipeline {
        let (workspace, inventory) = snapshot.into_catalogs();
        SyncPipeline::with_catalogs(config, workspace, inventory).unwrap()
    }

    fn fixture_pipeline() -> MemoryPipeline {
        let snapshot = snapshot();
        pipeline_with(config_for(&snapshot), snapshot)
    }

    #[tokio::test]
    async fn full_pass_over_the_fixture() {
        let pipeline = fixture_pipeline();
        let report = pipeline.run_once().await.unwrap();

        assert_eq!(report.workspace_pages, 4);
        assert_eq!(report.inventory_apps, 2);
        assert_eq!(report.batches.len(), 4);
        assert_eq!(report.applied(), 4);
        assert_eq!(report.failed(), 0);
        assert!(!report.dry_run);

        assert_eq!(
            pipeline.inventory().calls(),
            vec![
                InventoryCall::CreateCustom(CreateAppRequest {
                    name: "Foo".into(),
                    url: "https://foo".into(),
                    state: AppState::Discovered,
                    category: AppCategory::Other,
                    description: Some(String::new()),
                    tags: None,
                }),
                InventoryCall::AddKnown(1000),
                InventoryCall::Update {
                    id: 10000,
                    body: UpdateAppRequest {
                        url: Some("https://bar".into()),
                        state: Some(AppState::Sanctioned),
                        description: Some("Internal wiki".into()),
                        tags: None,
                        ..Default::default()
                    },
                },
            ]
        );

        let workspace_calls = pipeline.workspace().calls();
        assert_eq!(workspace_calls.len(), 1);
        assert!(matches!(
            &workspace_calls[0],
            WorkspaceCall::Create { app, .. } if app.name == "Zoom"
        ));
    }

    #[tokio::test]
    async fn archived_pages_are_not_treated_as_present() {
        let pipeline = fixture_pipeline();
        let report = pipeline.run_once().await.unwrap();
        let added = report
            .batch(Direction::WorkspaceToInventory, BatchKind::Add)
            .unwrap();
        assert!(added.items.iter().all(|i| i.name != "Retired Tool"));
    }

    #[tokio::test]
    async fn second_pass_adds_nothing() {
        let pipeline = fixture_pipeline();
        pipeline.run_once().await.unwrap();
        let report = pipeline.run_once().await.unwrap();

        for direction in [Direction::WorkspaceToInventory, Direction::InventoryToWorkspace] {
            let adds = report.batch(direction, BatchKind::Add).unwrap();
            assert!(adds.items.is_empty(), "{direction} still adding");
        }
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn descriptions_survive_repeated_passes() {
        let pipeline = fixture_pipeline();
        pipeline.run_once().await.unwrap();
        pipeline.run_once().await.unwrap();

        let inventory_bar = pipeline
            .inventory()
            .apps()
            .into_iter()
            .find(|a| a.name == "Bar")
            .unwrap();
        assert_eq!(inventory_bar.state, AppState::Sanctioned);
        assert_eq!(inventory_bar.description.as_deref(), Some("Internal wiki"));

        let workspace_bar = pipeline
            .workspace()
            .pages()
            .into_iter()
            .find(|p| p.name() == "Bar")
            .unwrap();
        assert_eq!(workspace_bar.description().as_deref(), Some("Internal wiki"));
        let description_patches = pipeline
            .workspace()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, WorkspaceCall::Update { patch, .. } if patch.description.is_some()))
            .count();
        assert_eq!(description_patches, 0);
    }

    #[tokio::test]
    async fn plan_leaves_the_catalogs_alone() {
        let pipeline = fixture_pipeline();
        let report = pipeline.plan().await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.applied(), 4);
        assert!(pipeline.inventory().calls().is_empty());
        assert!(pipeline.workspace().calls().is_empty());
    }

    #[tokio::test]
    async fn direction_toggles_skip_writes() {
        let snapshot = snapshot();
        let config = SyncConfig {
            push_to_workspace: false,
            ..config_for(&snapshot)
        };
        let pipeline = pipeline_with(config, snapshot);
        let report = pipeline.run_once().await.unwrap();

        assert_eq!(report.batches.len(), 2);
        assert!(report
            .batches
            .iter()
            .all(|b| b.direction == Direction::WorkspaceToInventory));
        assert!(pipeline.workspace().calls().is_empty());
    }

    #[tokio::test]
    async fn item_failures_do_not_abort_the_run() {
        let snapshot = snapshot();
        let config = config_for(&snapshot);
        let (workspace, inventory) = snapshot.into_catalogs();
        let pipeline =
            SyncPipeline::with_catalogs(config, workspace.failing_on("Zoom"), inventory.failing_on("Foo"))
                .unwrap();

        let report = pipeline.run_once().await.unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(report.applied(), 2);
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_any_write() {
        let snapshot = snapshot();
        let config = config_for(&snapshot);
        let (workspace, inventory) = snapshot.into_catalogs();
        let pipeline =
            SyncPipeline::with_catalogs(config, workspace, inventory.failing_list()).unwrap();

        let err = pipeline.run_once().await.unwrap_err();
        assert!(format!("{err:#}").contains("listing inventory apps"));
        assert!(pipeline.workspace().calls().is_empty());
        assert!(pipeline.inventory().calls().is_empty());
    }

    #[tokio::test]
    async fn untitled_live_page_is_fatal() {
        let mut snapshot = snapshot();
        snapshot.workspace_pages[0].properties.name.title.clear();
        let pipeline = pipeline_with(config_for(&snapshot), snapshot);

        let err = pipeline.run_once().await.unwrap_err();
        assert!(format!("{err:#}").contains("empty Name title"));
        assert!(pipeline.inventory().calls().is_empty());
    }

    #[tokio::test]
    async fn report_is_written_per_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = snapshot();
        let config = SyncConfig {
            reports_dir: Some(dir.path().to_path_buf()),
            ..config_for(&snapshot)
        };
        let pipeline = pipeline_with(config, snapshot);

        let report = pipeline.run_once().await.unwrap();
        let path = dir
            .path()
            .join(report.run_id.to_string())
            .join("sync_report.json");
        assert_eq!(report.report_path.as_deref(), Some(path.display().to_string().as_str()));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["run_id"], report.run_id.to_string());
        assert_eq!(written["batches"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn pipeline_requires_a_database_id() {
        let result = SyncPipeline::with_catalogs(
            SyncConfig::default(),
            InMemoryWorkspace::default(),
            InMemoryInventory::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn scheduler_rejects_bad_cron() {
        let snapshot = snapshot();
        let config = SyncConfig {
            sync_cron: "every hour please".into(),
            ..config_for(&snapshot)
        };
        let pipeline = Arc::new(pipeline_with(config, snapshot));
        assert!(build_scheduler(pipeline).await.is_err());
    }
}
