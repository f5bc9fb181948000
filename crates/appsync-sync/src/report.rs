use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    WorkspaceToInventory,
    InventoryToWorkspace,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::WorkspaceToInventory => "workspace -> inventory",
            Direction::InventoryToWorkspace => "inventory -> workspace",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Add,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    AddedKnownApp,
    CreatedCustomApp,
    UpdatedApp,
    CreatedPage,
    UpdatedPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied { action: ItemAction },
    Unchanged,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Outcomes of one applier invocation, in the order items were processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub direction: Direction,
    pub kind: BatchKind,
    pub items: Vec<ItemResult>,
}

impl BatchReport {
    pub fn new(direction: Direction, kind: BatchKind) -> Self {
        Self {
            direction,
            kind,
            items: Vec::new(),
        }
    }

    pub fn record<E: fmt::Display>(&mut self, name: String, result: Result<ItemAction, E>) {
        match result {
            Ok(action) => {
                info!(direction = %self.direction, %name, ?action, "applied");
                self.items.push(ItemResult {
                    name,
                    outcome: ItemOutcome::Applied { action },
                });
            }
            Err(err) => self.fail(name, err),
        }
    }

    pub fn fail(&mut self, name: String, error: impl fmt::Display) {
        let error = error.to_string();
        warn!(direction = %self.direction, %name, %error, "item skipped");
        self.items.push(ItemResult {
            name,
            outcome: ItemOutcome::Failed { error },
        });
    }

    pub fn unchanged(&mut self, name: String) {
        debug!(direction = %self.direction, %name, "content identical, nothing to write");
        self.items.push(ItemResult {
            name,
            outcome: ItemOutcome::Unchanged,
        });
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Applied { .. }))
    }

    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Writes went to an in-memory copy of the catalogs, not the remote APIs.
    pub dry_run: bool,
    pub workspace_pages: usize,
    pub inventory_apps: usize,
    pub batches: Vec<BatchReport>,
    pub report_path: Option<String>,
}

impl SyncReport {
    pub fn applied(&self) -> usize {
        self.batches.iter().map(BatchReport::applied).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.batches.iter().map(BatchReport::unchanged_count).sum()
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(BatchReport::failed).sum()
    }

    pub fn batch(&self, direction: Direction, kind: BatchKind) -> Option<&BatchReport> {
        self.batches
            .iter()
            .find(|b| b.direction == direction && b.kind == kind)
    }
}
