use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tariff_catalog::{Adjustment, PriceQuery, PriceResolutionEngine};
use tariff_conflict::{ConflictDetector, PriceEdit};
use tariff_shared::{
    ConflictReport, PriceConflict, ResolutionOutcome, ResolutionStrategy, Scope, ScopeLevel,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/resolve", post(resolve_price))
        .route("/pricing/detect-conflicts", post(detect_conflicts))
        .route("/pricing/resolve-conflict", post(resolve_conflict))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvePriceRequest {
    pub product_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD`; now when absent
    pub as_of_date: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvePriceResponse {
    /// Base price before modifiers, from the most specific book
    pub master_price: f64,
    pub compare_at_price: Option<f64>,
    pub currency: String,
    pub price_book_id: Uuid,
    pub price_level: ScopeLevel,
    pub adjustments: Vec<Adjustment>,
    pub final_price: f64,
    pub quantity: u32,
    pub line_total: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectConflictsRequest {
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    pub product_id: Uuid,
    pub new_price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConflictRequest {
    pub resolution_id: ResolutionStrategy,
    pub product_id: Uuid,
    pub new_price: f64,
    pub old_price: f64,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    #[serde(default)]
    pub conflicts: Vec<PriceConflict>,
    pub update_level: Option<ScopeLevel>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /pricing/resolve
async fn resolve_price(
    State(state): State<AppState>,
    Json(req): Json<ResolvePriceRequest>,
) -> Result<Json<ResolvePriceResponse>, AppError> {
    if req.quantity == 0 {
        return Err(AppError::invalid("quantity", "must be at least 1"));
    }
    let as_of = match req.as_of_date.as_deref() {
        Some(raw) => parse_as_of(raw)
            .ok_or_else(|| AppError::invalid("asOfDate", "expected RFC 3339 or YYYY-MM-DD"))?,
        None => Utc::now(),
    };

    let snapshot = state.store.snapshot().await?;
    let breakdown = PriceResolutionEngine::new(&snapshot).resolve(&PriceQuery {
        product_id: req.product_id,
        zone_id: req.zone_id,
        segment_id: req.segment_id,
        quantity: req.quantity,
        as_of,
    })?;

    Ok(Json(ResolvePriceResponse {
        master_price: breakdown.base.amount,
        compare_at_price: breakdown.base.compare_at,
        currency: breakdown.base.currency,
        price_book_id: breakdown.base.source_book_id,
        price_level: breakdown.base.level,
        adjustments: breakdown.adjustments,
        final_price: breakdown.final_price,
        quantity: breakdown.quantity,
        line_total: breakdown.line_total,
    }))
}

/// POST /pricing/detect-conflicts
async fn detect_conflicts(
    State(state): State<AppState>,
    Json(req): Json<DetectConflictsRequest>,
) -> Result<Json<ConflictReport>, AppError> {
    tariff_core::validation::validate_price(req.new_price, None)?;
    let snapshot = state.store.snapshot().await?;
    let scope = Scope::new(req.zone_id, req.segment_id);
    Ok(Json(ConflictDetector::detect(&snapshot, &scope, req.product_id, req.new_price)))
}

/// POST /pricing/resolve-conflict
async fn resolve_conflict(
    State(state): State<AppState>,
    Json(req): Json<ResolveConflictRequest>,
) -> Result<Json<ResolutionOutcome>, AppError> {
    let scope = Scope::new(req.zone_id, req.segment_id);
    if let Some(level) = req.update_level {
        if level != scope.level() {
            return Err(AppError::invalid(
                "updateLevel",
                "does not match the zone and segment supplied",
            ));
        }
    }

    let edit = PriceEdit {
        product_id: req.product_id,
        scope,
        old_price: req.old_price,
        new_price: req.new_price,
        compare_at_price: None,
    };
    let outcome = state
        .writer
        .resolve_conflict(req.resolution_id, edit, req.conflicts)
        .await?;

    tracing::info!(
        "Resolved {:?} for product {}: {} entr(ies) written",
        req.resolution_id,
        req.product_id,
        outcome.updated_count
    );
    Ok(Json(outcome))
}

fn parse_as_of(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
