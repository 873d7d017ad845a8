//! Aggregates shared by the lead list and analytics views.
//!
//! Everything is recomputed from the full row set on every call; there is no
//! incremental maintenance and no database-side aggregation.

use crate::models::{Lead, LeadStatus, Priority};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryCount {
    /// Capitalized industry name, e.g. "Technology".
    pub industry: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: LeadStatus,
    pub count: usize,
}

/// Derived dashboard state for a snapshot of leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAnalytics {
    pub total_leads: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    /// Mean `ai_score` over leads that have one; 0 when none do.
    pub average_score: f64,
    /// Percentage of leads with status `converted`.
    pub conversion_rate: f64,
    /// Per-industry counts in first-seen order of the scan.
    pub leads_by_industry: Vec<IndustryCount>,
    /// Per-status counts in first-seen order of the scan.
    pub leads_by_status: Vec<StatusCount>,
}

impl Default for LeadAnalytics {
    fn default() -> Self {
        Self::from_leads(&[])
    }
}

/// Uppercases the first character, leaving the rest as is.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Counts items by key, keeping keys in the order they were first seen.
fn tally_in_order<K: PartialEq>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut tally: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match tally.iter_mut().find(|(seen, _)| *seen == key) {
            Some((_, count)) => *count += 1,
            None => tally.push((key, 1)),
        }
    }
    tally
}

impl LeadAnalytics {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let total_leads = leads.len();
        let count_priority =
            |priority: Priority| leads.iter().filter(|l| l.ai_priority == Some(priority)).count();

        let scores: Vec<f64> = leads.iter().filter_map(|l| l.ai_score).collect();
        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        let converted = leads
            .iter()
            .filter(|l| l.status == LeadStatus::Converted)
            .count();
        let conversion_rate = if total_leads == 0 {
            0.0
        } else {
            converted as f64 * 100.0 / total_leads as f64
        };

        let leads_by_industry = tally_in_order(leads.iter().map(|l| l.industry))
            .into_iter()
            .map(|(industry, count)| IndustryCount {
                industry: capitalize(industry.as_str()),
                count,
            })
            .collect();

        let leads_by_status = tally_in_order(leads.iter().map(|l| l.status))
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();

        Self {
            total_leads,
            high_priority: count_priority(Priority::High),
            medium_priority: count_priority(Priority::Medium),
            low_priority: count_priority(Priority::Low),
            average_score,
            conversion_rate,
            leads_by_industry,
            leads_by_status,
        }
    }
}
