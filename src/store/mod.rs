//! Persistence provider contract for the `leads` table.
//!
//! The store offers row CRUD plus a change feed that announces *that* the
//! table changed (insert/update/delete), never *what* changed. Consumers
//! re-read the full table when notified.

use crate::errors::AppError;
use crate::models::{Lead, LeadUpdate, NewLead};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryLeadStore;
pub use postgres::PgLeadStore;

/// Buffered notifications per subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Kind of write that touched the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Parses a trigger operation name (`INSERT`, `UPDATE`, `DELETE`, any case).
    pub fn from_operation(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "insert" => Some(ChangeKind::Insert),
            "update" => Some(ChangeKind::Update),
            "delete" | "truncate" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// "Something changed" notification for the leads table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadChange {
    pub kind: ChangeKind,
}

/// Fan-out of change notifications to any number of subscribers.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<LeadChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes a notification; dropped silently when nobody listens.
    pub fn publish(&self, kind: ChangeKind) {
        let _ = self.tx.send(LeadChange { kind });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadChange> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

/// Row storage for leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// All leads, newest `created_at` first.
    async fn list(&self) -> Result<Vec<Lead>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, AppError>;

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError>;

    /// Inserts a batch in one statement group; either all rows land or none.
    async fn insert_many(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError>;

    /// Merges `update` into the row; `None` when the id does not exist.
    async fn update(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError>;

    /// Returns the number of rows removed (0 for an unknown id).
    async fn delete(&self, id: Uuid) -> Result<u64, AppError>;

    /// Removes every row; returns the number removed.
    async fn delete_all(&self) -> Result<u64, AppError>;

    /// Subscribes to table change notifications.
    fn subscribe(&self) -> broadcast::Receiver<LeadChange>;
}
