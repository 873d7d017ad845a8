use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Industry, LeadScoreRequest, LeadScoreResponse, LeadSource, Priority};
use reqwest::Client;

/// Weight used when a lead has no source or one outside the known table.
pub const DEFAULT_ENGAGEMENT_WEIGHT: f64 = 0.5;

/// Score substituted when the scoring provider cannot be reached.
pub const FALLBACK_SCORE: f64 = 50.0;
pub const FALLBACK_PROBABILITY: f64 = 0.5;
pub const FALLBACK_PRIORITY: Priority = Priority::Medium;

/// Maps a raw source string to the engagement weight sent to the scoring provider.
///
/// Matching is exact: `"Referral"` is not `"referral"` and weighs 0.5.
pub fn engagement_weight(source: Option<&str>) -> f64 {
    source
        .and_then(|s| s.parse::<LeadSource>().ok())
        .map(|s| s.engagement_weight())
        .unwrap_or(DEFAULT_ENGAGEMENT_WEIGHT)
}

/// Score and priority resolved for a new lead.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadScore {
    pub score: f64,
    pub probability: f64,
    pub priority: Priority,
    /// True when the values are the fallback defaults.
    pub fallback: bool,
}

impl LeadScore {
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            probability: FALLBACK_PROBABILITY,
            priority: FALLBACK_PRIORITY,
            fallback: true,
        }
    }
}

impl From<LeadScoreResponse> for LeadScore {
    fn from(response: LeadScoreResponse) -> Self {
        Self {
            score: response.score,
            probability: response.probability,
            priority: response.priority,
            fallback: false,
        }
    }
}

/// Client for the external lead scoring provider.
#[derive(Clone)]
pub struct ScoringService {
    client: Client,
    base_url: String,
}

impl ScoringService {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.scoring_service_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls `POST {base}/predict/lead-score`. No retries.
    pub async fn predict(&self, request: &LeadScoreRequest) -> Result<LeadScoreResponse, AppError> {
        let url = format!("{}/predict/lead-score", self.base_url);
        tracing::debug!(
            "Requesting lead score: size={}, industry={}, engagement={}",
            request.company_size,
            request.industry,
            request.engagement_score
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Scoring request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Scoring service returned status {}: {}",
                status, error_text
            )));
        }

        response.json::<LeadScoreResponse>().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse scoring response: {}", e))
        })
    }

    /// Scores a lead, substituting the fallback values on any provider failure.
    pub async fn score_lead(
        &self,
        company_size: i32,
        industry: Industry,
        engagement_score: f64,
    ) -> LeadScore {
        let request = LeadScoreRequest {
            company_size,
            industry,
            engagement_score,
        };

        match self.predict(&request).await {
            Ok(response) => {
                tracing::info!(
                    "Lead scored {:.2} ({})",
                    response.score,
                    response.priority.as_str()
                );
                response.into()
            }
            Err(e) => {
                tracing::warn!("Scoring service unavailable, using fallback score: {}", e);
                LeadScore::fallback()
            }
        }
    }
}
