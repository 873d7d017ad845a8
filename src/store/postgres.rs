use super::{ChangeFeed, ChangeKind, LeadChange, LeadStore};
use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, LeadRow, LeadUpdate, NewLead};
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Channel the `leads` statement trigger notifies on (see migrations).
pub const LEADS_NOTIFY_CHANNEL: &str = "leads_changed";

const LEAD_COLUMNS: &str = "id, company_name, contact_email, contact_name, industry, \
     company_size, source, ai_score, ai_priority, status, created_at, updated_at";

/// What the listener loop does with one `try_recv` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerStep {
    Publish(ChangeKind),
    /// Connection dropped or errored; subscribers must refetch.
    Resync,
    Stop,
}

fn listener_step(outcome: Result<Option<&str>, &sqlx::Error>) -> ListenerStep {
    match outcome {
        Ok(Some(payload)) => ListenerStep::Publish(
            ChangeKind::from_operation(payload).unwrap_or(ChangeKind::Update),
        ),
        Ok(None) => ListenerStep::Resync,
        Err(sqlx::Error::PoolClosed) => ListenerStep::Stop,
        Err(_) => ListenerStep::Resync,
    }
}

/// Postgres-backed lead store.
///
/// Change notifications come from `LISTEN leads_changed`, so writes made by
/// other processes (other API replicas, `manage_leads`) reach subscribers too.
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgLeadStore {
    /// Creates the store without starting the notification listener.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::default(),
        }
    }

    /// Creates the store and starts forwarding table notifications.
    pub async fn connect(pool: PgPool) -> Result<Self, AppError> {
        let store = Self::new(pool);
        store.spawn_listener().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Listens on [`LEADS_NOTIFY_CHANNEL`] and republishes every notification
    /// on the in-process feed. `PgListener` reconnects on its own after a
    /// dropped connection; each drop publishes an extra update so views
    /// refetch whatever was missed. Stops once the pool is closed.
    pub async fn spawn_listener(&self) -> Result<JoinHandle<()>, AppError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .context("Failed to open notification listener")?;
        listener
            .listen(LEADS_NOTIFY_CHANNEL)
            .await
            .context("Failed to LISTEN on leads channel")?;
        tracing::info!("Listening for lead changes on '{}'", LEADS_NOTIFY_CHANNEL);

        let feed = self.feed.clone();
        Ok(tokio::spawn(async move {
            loop {
                let outcome = listener.try_recv().await;
                let step = listener_step(
                    outcome
                        .as_ref()
                        .map(|n| n.as_ref().map(|notification| notification.payload())),
                );

                match step {
                    ListenerStep::Publish(kind) => {
                        tracing::debug!("Lead change notification: {:?}", kind);
                        feed.publish(kind);
                    }
                    ListenerStep::Resync => {
                        // Notifications sent while disconnected are lost.
                        match outcome {
                            Err(e) => tracing::warn!("Lead change listener error: {}", e),
                            Ok(_) => tracing::warn!("Lead change listener reconnecting"),
                        }
                        feed.publish(ChangeKind::Update);
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                    ListenerStep::Stop => {
                        tracing::info!("Connection pool closed, stopping lead change listener");
                        break;
                    }
                }
            }
        }))
    }

    fn into_lead(row: LeadRow) -> Result<Lead, AppError> {
        let id = row.id;
        Lead::try_from(row)
            .map_err(|e| AppError::InternalError(format!("Corrupt lead row {}: {}", id, e)))
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads ORDER BY created_at DESC",
            LEAD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch leads")?;

        rows.into_iter().map(Self::into_lead).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch lead {}", id))?;

        row.map(Self::into_lead).transpose()
    }

    async fn insert(&self, lead: NewLead) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "INSERT INTO leads (company_name, contact_email, contact_name, industry, \
             company_size, source, ai_score, ai_priority, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(&lead.company_name)
        .bind(&lead.contact_email)
        .bind(&lead.contact_name)
        .bind(lead.industry.as_str())
        .bind(lead.company_size)
        .bind(lead.source.map(|s| s.as_str()))
        .bind(lead.ai_score)
        .bind(lead.ai_priority.map(|p| p.as_str()))
        .bind(lead.status.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")?;

        Self::into_lead(row)
    }

    async fn insert_many(&self, leads: Vec<NewLead>) -> Result<Vec<Lead>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let mut created = Vec::with_capacity(leads.len());

        for lead in leads {
            let row = sqlx::query_as::<_, LeadRow>(&format!(
                "INSERT INTO leads (company_name, contact_email, contact_name, industry, \
                 company_size, source, ai_score, ai_priority, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
                LEAD_COLUMNS
            ))
            .bind(&lead.company_name)
            .bind(&lead.contact_email)
            .bind(&lead.contact_name)
            .bind(lead.industry.as_str())
            .bind(lead.company_size)
            .bind(lead.source.map(|s| s.as_str()))
            .bind(lead.ai_score)
            .bind(lead.ai_priority.map(|p| p.as_str()))
            .bind(lead.status.as_str())
            .fetch_one(&mut *tx)
            .await
            .context("Failed to insert lead batch")?;
            created.push(Self::into_lead(row)?);
        }

        tx.commit().await.context("Failed to commit lead batch")?;
        Ok(created)
    }

    async fn update(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError> {
        if update.is_empty() {
            return self.get(id).await;
        }

        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads SET \
                company_name = COALESCE($2, company_name), \
                contact_email = COALESCE($3, contact_email), \
                contact_name = COALESCE($4, contact_name), \
                industry = COALESCE($5, industry), \
                company_size = COALESCE($6, company_size), \
                source = COALESCE($7, source), \
                status = COALESCE($8, status) \
             WHERE id = $1 RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(&update.company_name)
        .bind(&update.contact_email)
        .bind(&update.contact_name)
        .bind(update.industry.map(|i| i.as_str()))
        .bind(update.company_size)
        .bind(update.source.map(|s| s.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update lead {}", id))?;

        row.map(Self::into_lead).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete lead {}", id))?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM leads")
            .execute(&self.pool)
            .await
            .context("Failed to delete all leads")?;

        Ok(result.rows_affected())
    }

    fn subscribe(&self) -> broadcast::Receiver<LeadChange> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_step_maps_notifications() {
        assert_eq!(
            listener_step(Ok(Some("INSERT"))),
            ListenerStep::Publish(ChangeKind::Insert)
        );
        assert_eq!(
            listener_step(Ok(Some("TRUNCATE"))),
            ListenerStep::Publish(ChangeKind::Delete)
        );
        assert_eq!(
            listener_step(Ok(Some("something else"))),
            ListenerStep::Publish(ChangeKind::Update)
        );
    }

    #[test]
    fn test_listener_step_resyncs_after_disconnect() {
        assert_eq!(listener_step(Ok(None)), ListenerStep::Resync);
        assert_eq!(
            listener_step(Err(&sqlx::Error::PoolTimedOut)),
            ListenerStep::Resync
        );
    }

    #[test]
    fn test_listener_step_stops_on_closed_pool() {
        assert_eq!(
            listener_step(Err(&sqlx::Error::PoolClosed)),
            ListenerStep::Stop
        );
    }
}
