//! Destructive bulk operations on the whole `leads` table.
//!
//! Neither operation is transactional across its steps: if the demo insert
//! fails after the delete, the table is left empty.

use crate::errors::{AppError, ResultExt};
use crate::models::{BulkActionResult, Industry, LeadSource, LeadStatus, NewLead, Priority};
use crate::store::LeadStore;

/// Callers must obtain this from an explicit user confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed(());

impl Confirmed {
    /// Converts a yes/no answer into a confirmation token.
    pub fn from_answer(confirmed: bool) -> Result<Self, AppError> {
        if confirmed {
            Ok(Confirmed(()))
        } else {
            Err(AppError::BadRequest(
                "This action requires explicit confirmation".to_string(),
            ))
        }
    }
}

pub const CLEAR_ALL_PROMPT: &str =
    "Are you sure you want to delete all leads? This action cannot be undone.";
pub const RESET_PROMPT: &str =
    "Reset to demo data? This will replace all current leads with example data.";

/// The five example leads inserted by [`reset_to_demo_data`]. Scores are
/// pre-assigned; the scoring provider is not consulted.
pub fn demo_leads() -> Vec<NewLead> {
    let demo = |company_name: &str,
                contact_email: &str,
                contact_name: &str,
                industry: Industry,
                company_size: i32,
                source: LeadSource,
                ai_score: f64,
                ai_priority: Priority| NewLead {
        company_name: company_name.to_string(),
        contact_email: contact_email.to_string(),
        contact_name: Some(contact_name.to_string()),
        industry,
        company_size,
        source: Some(source),
        ai_score: Some(ai_score),
        ai_priority: Some(ai_priority),
        status: LeadStatus::New,
    };

    vec![
        demo(
            "TechCorp Inc",
            "ceo@techcorp.com",
            "Sarah Johnson",
            Industry::Technology,
            1000,
            LeadSource::Referral,
            89.7,
            Priority::High,
        ),
        demo(
            "Small Retail Shop",
            "owner@smallshop.com",
            "Mike Chen",
            Industry::Retail,
            5,
            LeadSource::Cold,
            12.3,
            Priority::Low,
        ),
        demo(
            "Finance Solutions",
            "contact@finance.com",
            "Lisa Rodriguez",
            Industry::Finance,
            500,
            LeadSource::Website,
            67.8,
            Priority::Medium,
        ),
        demo(
            "HealthTech Startup",
            "founder@healthtech.com",
            "Dr. Alex Kim",
            Industry::Healthcare,
            50,
            LeadSource::Event,
            45.2,
            Priority::Medium,
        ),
        demo(
            "Manufacturing Giant",
            "procurement@mfg.com",
            "Robert Wilson",
            Industry::Manufacturing,
            5000,
            LeadSource::Referral,
            78.9,
            Priority::High,
        ),
    ]
}

/// Deletes every lead.
pub async fn clear_all(store: &dyn LeadStore, _: Confirmed) -> Result<BulkActionResult, AppError> {
    let deleted = store.delete_all().await.context("Failed to clear leads")?;
    tracing::info!("Cleared {} leads", deleted);

    Ok(BulkActionResult {
        deleted,
        inserted: 0,
    })
}

/// Deletes every lead, then inserts [`demo_leads`].
pub async fn reset_to_demo_data(
    store: &dyn LeadStore,
    _: Confirmed,
) -> Result<BulkActionResult, AppError> {
    let deleted = store.delete_all().await.context("Failed to clear leads")?;
    let inserted = store
        .insert_many(demo_leads())
        .await
        .context("Failed to insert demo leads")?
        .len();
    tracing::info!("Reset leads: {} deleted, {} demo leads inserted", deleted, inserted);

    Ok(BulkActionResult { deleted, inserted })
}
