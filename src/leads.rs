//! Lead lifecycle shared by the HTTP handlers
//!
//! Create is the only operation that leaves the persistence provider:
//! 1. Check the required fields are present
//! 2. Map the source to an engagement weight
//! 3. Ask the scoring provider for score/priority (fallback on any failure)
//! 4. Persist with status `new`

use crate::errors::{AppError, FieldErrors, ResultExt};
use crate::models::{CreateLeadRequest, Industry, Lead, LeadSource, LeadStatus, LeadUpdate, NewLead};
use crate::services::{engagement_weight, ScoringService};
use crate::store::LeadStore;
use std::sync::Arc;
use uuid::Uuid;

/// Upper bound on company size accepted at creation.
pub const MAX_COMPANY_SIZE: i64 = 100_000;

/// A create request that passed the presence and shape checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLead {
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: Option<String>,
    pub industry: Industry,
    pub company_size: i32,
    /// Raw source as submitted; may be outside the known set.
    pub source: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CreateLeadRequest {
    /// Presence check for the four required fields, then shape checks.
    ///
    /// A zero company size counts as missing.
    pub fn validate(self) -> Result<ValidatedLead, AppError> {
        let mut missing = FieldErrors::new();
        if present(&self.company_name).is_none() {
            missing.insert("company_name".into(), "Company name is required".into());
        }
        if present(&self.contact_email).is_none() {
            missing.insert("contact_email".into(), "Contact email is required".into());
        }
        if present(&self.industry).is_none() {
            missing.insert("industry".into(), "Industry is required".into());
        }
        if matches!(self.company_size, None | Some(0)) {
            missing.insert("company_size".into(), "Company size is required".into());
        }
        if !missing.is_empty() {
            return Err(AppError::Validation {
                message: "Missing required fields".into(),
                fields: missing,
            });
        }

        let mut invalid = FieldErrors::new();
        let industry = present(&self.industry)
            .and_then(|i| i.parse::<Industry>().ok());
        if industry.is_none() {
            invalid.insert("industry".into(), "Please select a valid industry".into());
        }
        let company_size = self
            .company_size
            .filter(|size| (1..=MAX_COMPANY_SIZE).contains(size))
            .and_then(|size| i32::try_from(size).ok());
        if company_size.is_none() {
            invalid.insert(
                "company_size".into(),
                "Company size must be between 1 and 100,000 employees".into(),
            );
        }

        match (industry, company_size) {
            (Some(industry), Some(company_size)) => Ok(ValidatedLead {
                company_name: self.company_name.unwrap_or_default().trim().to_string(),
                contact_email: self.contact_email.unwrap_or_default().trim().to_string(),
                contact_name: present(&self.contact_name).map(str::to_string),
                industry,
                company_size,
                source: present(&self.source).map(str::to_string),
            }),
            _ => Err(AppError::Validation {
                message: "Invalid lead data".into(),
                fields: invalid,
            }),
        }
    }
}

impl LeadUpdate {
    /// Range and length checks for the fields present in the update.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut invalid = FieldErrors::new();

        if let Some(ref company_name) = self.company_name {
            if !(2..=100).contains(&company_name.trim().chars().count()) {
                invalid.insert(
                    "company_name".into(),
                    "Company name must be between 2 and 100 characters".into(),
                );
            }
        }
        if let Some(ref contact_email) = self.contact_email {
            if contact_email.trim().is_empty() {
                invalid.insert("contact_email".into(), "Contact email is required".into());
            }
        }
        if let Some(ref contact_name) = self.contact_name {
            if !(2..=50).contains(&contact_name.trim().chars().count()) {
                invalid.insert(
                    "contact_name".into(),
                    "Contact name must be between 2 and 50 characters".into(),
                );
            }
        }
        if let Some(company_size) = self.company_size {
            if !(1..=MAX_COMPANY_SIZE).contains(&i64::from(company_size)) {
                invalid.insert(
                    "company_size".into(),
                    "Company size must be between 1 and 100,000 employees".into(),
                );
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "Invalid lead data".into(),
                fields: invalid,
            })
        }
    }
}

/// Lead Record API operations over a [`LeadStore`].
#[derive(Clone)]
pub struct LeadService {
    store: Arc<dyn LeadStore>,
    scoring: ScoringService,
}

impl LeadService {
    pub fn new(store: Arc<dyn LeadStore>, scoring: ScoringService) -> Self {
        Self { store, scoring }
    }

    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    /// All leads, newest first.
    pub async fn list(&self) -> Result<Vec<Lead>, AppError> {
        self.store.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Lead, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    /// Validates, scores and persists a new lead.
    ///
    /// Never fails because of the scoring provider; only validation and
    /// persistence errors surface.
    pub async fn create(&self, request: CreateLeadRequest) -> Result<Lead, AppError> {
        let lead = request.validate()?;

        let weight = engagement_weight(lead.source.as_deref());
        let score = self
            .scoring
            .score_lead(lead.company_size, lead.industry, weight)
            .await;
        if score.fallback {
            tracing::info!("Creating lead '{}' with fallback score", lead.company_name);
        }

        let source = lead.source.as_deref().and_then(|s| s.parse::<LeadSource>().ok());
        if source.is_none() {
            if let Some(ref raw) = lead.source {
                tracing::debug!("Unrecognized lead source '{}' not stored", raw);
            }
        }

        let new_lead = NewLead {
            company_name: lead.company_name,
            contact_email: lead.contact_email,
            contact_name: lead.contact_name,
            industry: lead.industry,
            company_size: lead.company_size,
            source,
            ai_score: Some(score.score),
            ai_priority: Some(score.priority),
            status: LeadStatus::New,
        };

        self.store
            .insert(new_lead)
            .await
            .context("Failed to create lead")
    }

    /// Merges a partial record into an existing lead.
    pub async fn update(&self, id: Uuid, update: LeadUpdate) -> Result<Lead, AppError> {
        update.validate()?;
        self.store
            .update(id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    /// Deletes by id. Deleting an unknown id is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let removed = self.store.delete(id).await?;
        if removed == 0 {
            tracing::debug!("Delete for unknown lead {} affected no rows", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> CreateLeadRequest {
        CreateLeadRequest {
            company_name: Some("Acme".into()),
            contact_email: Some("a@acme.com".into()),
            contact_name: None,
            industry: Some("technology".into()),
            company_size: Some(50),
            source: Some("referral".into()),
        }
    }

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let lead = acme().validate().unwrap();
        assert_eq!(lead.industry, Industry::Technology);
        assert_eq!(lead.company_size, 50);
        assert_eq!(lead.source.as_deref(), Some("referral"));
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let fields = field_errors(CreateLeadRequest::default().validate().unwrap_err());
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["company_name", "company_size", "contact_email", "industry"]
        );
    }

    #[test]
    fn test_zero_or_blank_counts_as_missing() {
        let mut request = acme();
        request.company_size = Some(0);
        request.company_name = Some("   ".into());
        let fields = field_errors(request.validate().unwrap_err());
        assert!(fields.contains_key("company_size"));
        assert!(fields.contains_key("company_name"));
    }

    #[test]
    fn test_shape_errors() {
        let mut request = acme();
        request.industry = Some("aerospace".into());
        request.company_size = Some(250_000);
        let fields = field_errors(request.validate().unwrap_err());
        assert_eq!(fields["industry"], "Please select a valid industry");
        assert!(fields.contains_key("company_size"));
    }

    #[test]
    fn test_unknown_source_passes_validation() {
        let mut request = acme();
        request.source = Some("billboard".into());
        let lead = request.validate().unwrap();
        assert_eq!(lead.source.as_deref(), Some("billboard"));
    }

    #[test]
    fn test_update_checks_present_fields_only() {
        assert!(LeadUpdate::default().validate().is_ok());

        let update = LeadUpdate {
            company_name: Some(String::new()),
            company_size: Some(-5),
            ..Default::default()
        };
        let fields = field_errors(update.validate().unwrap_err());
        assert!(fields.contains_key("company_name"));
        assert!(fields.contains_key("company_size"));
        assert!(!fields.contains_key("contact_email"));

        let too_big = LeadUpdate {
            company_size: Some(100_001),
            contact_name: Some("B".into()),
            ..Default::default()
        };
        let fields = field_errors(too_big.validate().unwrap_err());
        assert!(fields.contains_key("company_size"));
        assert!(fields.contains_key("contact_name"));

        let ok = LeadUpdate {
            company_name: Some("Acme Holdings".into()),
            company_size: Some(100_000),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_row_untouched() {
        use crate::store::MemoryLeadStore;

        let store = Arc::new(MemoryLeadStore::new());
        let service = LeadService::new(
            store.clone(),
            ScoringService::with_base_url("http://127.0.0.1:9"),
        );
        let lead = service.create(acme()).await.unwrap();

        let err = service
            .update(
                lead.id,
                LeadUpdate {
                    company_size: Some(-5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(service.get(lead.id).await.unwrap().company_size, 50);
    }
}
