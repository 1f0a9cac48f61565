use std::sync::Arc;
use tariff_conflict::PriceWriter;
use tariff_core::PricingStore;

#[derive(Clone)]
pub struct AppState {
    /// Read side: one snapshot per request
    pub store: Arc<dyn PricingStore>,
    /// Write side: scope-locked, atomic
    pub writer: Arc<PriceWriter>,
}
