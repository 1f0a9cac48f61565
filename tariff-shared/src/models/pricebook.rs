use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;

use super::default_true;

/// The (zone, segment) dimension a price book is restricted to.
///
/// Both unset is the master scope.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
}

/// Granularity of a scope, coarsest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeLevel {
    Master,
    Zone,
    Segment,
    ZoneSegment,
}

impl Scope {
    pub const MASTER: Scope = Scope { zone_id: None, segment_id: None };

    pub fn new(zone_id: Option<Uuid>, segment_id: Option<Uuid>) -> Self {
        Self { zone_id, segment_id }
    }

    pub fn level(&self) -> ScopeLevel {
        match (self.zone_id, self.segment_id) {
            (None, None) => ScopeLevel::Master,
            (Some(_), None) => ScopeLevel::Zone,
            (None, Some(_)) => ScopeLevel::Segment,
            (Some(_), Some(_)) => ScopeLevel::ZoneSegment,
        }
    }

    pub fn is_master(&self) -> bool {
        self.level() == ScopeLevel::Master
    }

    /// True when a book at `self` would mask a price written at `coarser`.
    pub fn is_finer_than(&self, coarser: &Scope) -> bool {
        match coarser.level() {
            ScopeLevel::Master => !self.is_master(),
            // segment-only books outrank zone-only ones for every zone
            ScopeLevel::Zone => match self.level() {
                ScopeLevel::Segment => true,
                ScopeLevel::ZoneSegment => self.zone_id == coarser.zone_id,
                _ => false,
            },
            ScopeLevel::Segment => {
                self.level() == ScopeLevel::ZoneSegment && self.segment_id == coarser.segment_id
            }
            ScopeLevel::ZoneSegment => false,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |id: Option<Uuid>| id.map(|u| u.to_string()).unwrap_or_else(|| "*".to_string());
        write!(f, "zone={} segment={}", part(self.zone_id), part(self.segment_id))
    }
}

/// A layer of base prices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBook {
    pub id: Uuid,
    pub name: String,
    pub currency: String,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    #[serde(default)]
    pub is_master: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PriceBook {
    pub fn scope(&self) -> Scope {
        Scope::new(self.zone_id, self.segment_id)
    }
}

/// Base price of one product inside one book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBookEntry {
    pub id: Uuid,
    pub price_book_id: Uuid,
    pub product_id: Uuid,
    pub base_price: f64,
    pub compare_at_price: Option<f64>,
}
