use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pricebook::{Scope, ScopeLevel};

/// How a coarser-scope edit treats finer overrides
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    Overwrite,
    Preserve,
    Relative,
}

impl ResolutionStrategy {
    pub const ALL: [ResolutionStrategy; 3] = [
        ResolutionStrategy::Overwrite,
        ResolutionStrategy::Preserve,
        ResolutionStrategy::Relative,
    ];

    pub fn option(self) -> ResolutionOption {
        let (label, description) = match self {
            ResolutionStrategy::Overwrite => (
                "Overwrite overrides",
                "Remove every finer-scope price so the new price applies everywhere",
            ),
            ResolutionStrategy::Preserve => (
                "Keep overrides",
                "Write the new price; finer-scope prices keep taking precedence",
            ),
            ResolutionStrategy::Relative => (
                "Scale overrides",
                "Write the new price and rescale finer-scope prices by the same ratio",
            ),
        };
        ResolutionOption {
            id: self,
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOption {
    pub id: ResolutionStrategy,
    pub label: String,
    pub description: String,
}

/// The finer-scope book holding an override
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRef {
    pub book_id: Uuid,
    #[serde(default)]
    pub book_name: String,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
}

impl ScopeRef {
    pub fn scope(&self) -> Scope {
        Scope::new(self.zone_id, self.segment_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceConflict {
    pub level: ScopeLevel,
    pub scope_ref: ScopeRef,
    pub current_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub edited_level: ScopeLevel,
    /// Resolved price at the edited scope before the change
    pub current_master_price: Option<f64>,
    pub new_price: f64,
    pub price_change: Option<f64>,
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub affected_count: usize,
    pub conflicts: Vec<PriceConflict>,
    pub impact_summary: ImpactSummary,
    pub resolution_options: Vec<ResolutionOption>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    pub updated_count: usize,
}
