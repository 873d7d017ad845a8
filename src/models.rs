use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Enumerations ============

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Industry sector of a lead's company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    Retail,
    Manufacturing,
}

impl Industry {
    pub const ALL: [Industry; 5] = [
        Industry::Technology,
        Industry::Finance,
        Industry::Healthcare,
        Industry::Retail,
        Industry::Manufacturing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Finance => "finance",
            Industry::Healthcare => "healthcare",
            Industry::Retail => "retail",
            Industry::Manufacturing => "manufacturing",
        }
    }
}

impl FromStr for Industry {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Industry::ALL
            .into_iter()
            .find(|industry| industry.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "industry",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel through which a lead arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Referral,
    Website,
    Cold,
    Event,
    Social,
}

impl LeadSource {
    pub const ALL: [LeadSource; 5] = [
        LeadSource::Referral,
        LeadSource::Website,
        LeadSource::Cold,
        LeadSource::Event,
        LeadSource::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Referral => "referral",
            LeadSource::Website => "website",
            LeadSource::Cold => "cold",
            LeadSource::Event => "event",
            LeadSource::Social => "social",
        }
    }

    /// Engagement weight fed to the scoring provider.
    pub fn engagement_weight(&self) -> f64 {
        match self {
            LeadSource::Referral => 0.9,
            LeadSource::Website => 0.7,
            LeadSource::Event => 0.6,
            LeadSource::Social => 0.5,
            LeadSource::Cold => 0.3,
        }
    }
}

impl FromStr for LeadSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "source",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage bucket assigned by the scoring provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Sales pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

// ============ Lead Entity ============

/// A sales prospect as stored by the persistence provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Identifier assigned by the store on insert.
    pub id: Uuid,
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: Option<String>,
    pub industry: Industry,
    pub company_size: i32,
    pub source: Option<LeadSource>,
    /// Score in `0..=100`, set once at creation.
    pub ai_score: Option<f64>,
    /// Priority bucket, set once at creation.
    pub ai_priority: Option<Priority>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `leads` row. Enum columns are stored as text and parsed on the way out.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: Option<String>,
    pub industry: String,
    pub company_size: i32,
    pub source: Option<String>,
    pub ai_score: Option<f64>,
    pub ai_priority: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = UnknownVariant;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(Lead {
            id: row.id,
            company_name: row.company_name,
            contact_email: row.contact_email,
            contact_name: row.contact_name,
            industry: row.industry.parse()?,
            company_size: row.company_size,
            source: row.source.as_deref().map(str::parse).transpose()?,
            ai_score: row.ai_score,
            ai_priority: row.ai_priority.as_deref().map(str::parse).transpose()?,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insert payload handed to the store. Scores are already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub company_name: String,
    pub contact_email: String,
    pub contact_name: Option<String>,
    pub industry: Industry,
    pub company_size: i32,
    pub source: Option<LeadSource>,
    pub ai_score: Option<f64>,
    pub ai_priority: Option<Priority>,
    pub status: LeadStatus,
}

/// Partial update body for `PUT /leads/{id}`.
///
/// Scoring fields are deliberately absent: they are assigned once at creation
/// and any `ai_score`/`ai_priority` keys in the body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LeadSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        self == &LeadUpdate::default()
    }

    /// Merges the provided fields into `lead`, leaving the rest untouched.
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(ref company_name) = self.company_name {
            lead.company_name = company_name.clone();
        }
        if let Some(ref contact_email) = self.contact_email {
            lead.contact_email = contact_email.clone();
        }
        if let Some(ref contact_name) = self.contact_name {
            lead.contact_name = Some(contact_name.clone());
        }
        if let Some(industry) = self.industry {
            lead.industry = industry;
        }
        if let Some(company_size) = self.company_size {
            lead.company_size = company_size;
        }
        if let Some(source) = self.source {
            lead.source = Some(source);
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
    }
}

// ============ Request/Response Models ============

/// Body of `POST /leads`, the submitted lead form.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Request sent to `POST {base}/predict/lead-score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoreRequest {
    pub company_size: i32,
    pub industry: Industry,
    pub engagement_score: f64,
}

/// Response returned by the scoring provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoreResponse {
    pub score: f64,
    pub probability: f64,
    pub priority: Priority,
}

/// Confirmation body required by the destructive bulk endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkActionRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Result of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionResult {
    pub deleted: u64,
    pub inserted: usize,
}
