use super::{ChangeFeed, ChangeKind, LeadChange, LeadStore};
use crate::errors::AppError;
use crate::models::{Lead, LeadUpdate, NewLead};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// In-process lead store with the same contract as [`super::PgLeadStore`].
///
/// Used by the test suites and for running the API without a database.
#[derive(Clone, Default)]
pub struct MemoryLeadStore {
    rows: Arc<RwLock<Vec<Lead>>>,
    feed: ChangeFeed,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn materialize(lead: NewLead) -> Lead {
        let now = Utc::now();
        Lead {
            id: Uuid::new_v4(),
            company_name: lead.company_name,
            contact_email: lead.contact_email,
            contact_name: lead.contact_name,
            industry: lead.industry,
            company_size: lead.company_size,
            source: lead.source,
            ai_score: lead.ai_score,
            ai_priority: lead.ai_priority,
            status: lead.status,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let rows = self.rows.read().await;
        // Rows are kept in insertion order; reversing first keeps the newest
        // first among equal timestamps after the stable sort.
        let mut leads: Vec<Lead> = rows.iter().rev().cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|lead| lead.id == id).cloned())
    }

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError> {
        let lead = Self::materialize(lead);
        self.rows.write().await.push(lead.clone());
        self.feed.publish(ChangeKind::Insert);
        Ok(lead)
    }

    async fn insert_many(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }
        let created: Vec<Lead> = leads.into_iter().map(Self::materialize).collect();
        self.rows.write().await.extend(created.iter().cloned());
        self.feed.publish(ChangeKind::Insert);
        Ok(created)
    }

    async fn update(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError> {
        let updated = {
            let mut rows = self.rows.write().await;
            match rows.iter_mut().find(|lead| lead.id == id) {
                Some(lead) => {
                    update.apply_to(lead);
                    lead.updated_at = Utc::now();
                    Some(lead.clone())
                }
                None => None,
            }
        };
        if updated.is_some() {
            self.feed.publish(ChangeKind::Update);
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let removed = {
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|lead| lead.id != id);
            (before - rows.len()) as u64
        };
        if removed > 0 {
            self.feed.publish(ChangeKind::Delete);
        }
        Ok(removed)
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let removed = {
            let mut rows = self.rows.write().await;
            let count = rows.len() as u64;
            rows.clear();
            count
        };
        self.feed.publish(ChangeKind::Delete);
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<LeadChange> {
        self.feed.subscribe()
    }
}
