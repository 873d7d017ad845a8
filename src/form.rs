//! The new-lead form: raw field input, validation, and submission.
//!
//! Validation runs before anything is sent. A successful submission clears the
//! form and exposes the assigned score; a failed one keeps the input and
//! surfaces the server's message.

use crate::api_client::{ClientError, LeadApiClient};
use crate::errors::FieldErrors;
use crate::leads::MAX_COMPANY_SIZE;
use crate::models::{Industry, LeadSource};
use serde::Serialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_company_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length < 2 {
        Err(invalid("length", "Company name must be at least 2 characters"))
    } else if length > 100 {
        Err(invalid("length", "Company name must be less than 100 characters"))
    } else {
        Ok(())
    }
}

fn validate_contact_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length < 2 {
        Err(invalid("length", "Contact name must be at least 2 characters"))
    } else if length > 50 {
        Err(invalid("length", "Contact name must be less than 50 characters"))
    } else {
        Ok(())
    }
}

fn validate_company_size(size: i64) -> Result<(), ValidationError> {
    if size < 1 {
        Err(invalid("range", "Company size must be at least 1 employee"))
    } else if size > MAX_COMPANY_SIZE {
        Err(invalid(
            "range",
            "Company size must be less than 100,000 employees",
        ))
    } else {
        Ok(())
    }
}

fn validate_industry(industry: &str) -> Result<(), ValidationError> {
    industry
        .parse::<Industry>()
        .map(|_| ())
        .map_err(|_| invalid("industry", "Please select a valid industry"))
}

fn validate_source(source: &str) -> Result<(), ValidationError> {
    source
        .parse::<LeadSource>()
        .map(|_| ())
        .map_err(|_| invalid("source", "Please select a valid lead source"))
}

/// Validated payload posted to `POST /leads`.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct LeadFormData {
    #[validate(custom(function = "validate_company_name"))]
    pub company_name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub contact_email: String,
    #[validate(custom(function = "validate_contact_name"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[validate(custom(function = "validate_industry"))]
    pub industry: String,
    #[validate(custom(function = "validate_company_size"))]
    pub company_size: i64,
    #[validate(custom(function = "validate_source"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Outcome of [`LeadForm::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// The lead was created with this score.
    Created { ai_score: Option<f64> },
    /// The API rejected the submission or could not be reached.
    Failed(String),
}

/// Raw form input as typed by the user, plus display state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadForm {
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: String,
    pub industry: String,
    pub company_size: String,
    pub source: String,

    /// Messages shown next to each invalid field.
    pub errors: FieldErrors,
    /// Message from the last failed submission.
    pub server_error: Option<String>,
    /// Score of the last successfully created lead.
    pub last_score: Option<f64>,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn collect_errors(errors: &ValidationErrors, into: &mut FieldErrors) {
    for (field, field_errors) in errors.field_errors() {
        let message = field_errors
            .iter()
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| format!("Invalid {}", field));
        into.entry(field.to_string()).or_insert(message);
    }
}

impl LeadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every field and returns the payload or per-field messages.
    pub fn validate(&self) -> Result<LeadFormData, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.company_name.trim().is_empty() {
            errors.insert("company_name".into(), "Company name is required".into());
        }
        if self.contact_email.trim().is_empty() {
            errors.insert("contact_email".into(), "Contact email is required".into());
        }

        let company_size = match self.company_size.trim() {
            "" => {
                errors.insert("company_size".into(), "Company size is required".into());
                0
            }
            raw => match raw.parse::<i64>() {
                Ok(size) => size,
                Err(_) => {
                    let message = if raw.parse::<f64>().is_ok() {
                        "Company size must be a whole number"
                    } else {
                        "Company size must be a number"
                    };
                    errors.insert("company_size".into(), message.into());
                    0
                }
            },
        };

        let data = LeadFormData {
            company_name: self.company_name.trim().to_string(),
            contact_email: self.contact_email.trim().to_string(),
            contact_name: optional(&self.contact_name),
            industry: self.industry.trim().to_string(),
            company_size,
            source: optional(&self.source),
        };

        if let Err(validation) = data.validate() {
            collect_errors(&validation, &mut errors);
        }

        if errors.is_empty() {
            Ok(data)
        } else {
            Err(errors)
        }
    }

    /// Resets every input and the field errors; keeps `last_score`.
    pub fn clear(&mut self) {
        let last_score = self.last_score;
        *self = Self {
            last_score,
            ..Self::default()
        };
    }

    /// Validates and posts the form to the Lead Record API.
    pub async fn submit(&mut self, client: &LeadApiClient) -> SubmitOutcome {
        self.server_error = None;

        let data = match self.validate() {
            Ok(data) => data,
            Err(errors) => {
                self.errors = errors.clone();
                return SubmitOutcome::Invalid(errors);
            }
        };
        self.errors.clear();

        match client.create_lead(&data).await {
            Ok(lead) => {
                tracing::info!(
                    "Lead '{}' created with score {:?}",
                    lead.company_name,
                    lead.ai_score
                );
                self.last_score = lead.ai_score;
                self.clear();
                SubmitOutcome::Created {
                    ai_score: lead.ai_score,
                }
            }
            Err(e) => {
                let message = match e {
                    ClientError::Api {
                        message, fields, ..
                    } => {
                        self.errors.extend(fields);
                        message
                    }
                    other => other.to_string(),
                };
                tracing::warn!("Lead submission failed: {}", message);
                self.server_error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}
