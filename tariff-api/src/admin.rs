use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tariff_conflict::NewPriceBook;
use tariff_core::validation::validate_rules;
use tariff_shared::{
    AttributeRule, PriceBook, PriceModifier, ProductAttribute, ResolutionOutcome, RuleOutcome,
    Scope,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/price-books", post(create_price_book))
        .route("/price-books/entries", put(set_price))
        .route("/modifiers", post(create_modifier))
        .route("/modifiers/{id}", put(update_modifier))
        .route("/attributes/apply", post(apply_attribute_rules))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPriceRequest {
    pub product_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    pub base_price: f64,
    pub compare_at_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyAttributesRequest {
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub rules: Vec<AttributeRule>,
    #[serde(default)]
    pub selected_values: BTreeMap<String, String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /price-books
async fn create_price_book(
    State(state): State<AppState>,
    Json(req): Json<NewPriceBook>,
) -> Result<(StatusCode, Json<PriceBook>), AppError> {
    let book = state.writer.create_price_book(req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /price-books/entries
///
/// 409 with the conflict report when finer overrides would mask the price;
/// the caller then picks a strategy via /pricing/resolve-conflict.
async fn set_price(
    State(state): State<AppState>,
    Json(req): Json<SetPriceRequest>,
) -> Result<Json<ResolutionOutcome>, AppError> {
    let scope = Scope::new(req.zone_id, req.segment_id);
    let outcome = state
        .writer
        .set_price(req.product_id, scope, req.base_price, req.compare_at_price)
        .await?;
    Ok(Json(outcome))
}

/// POST /modifiers
async fn create_modifier(
    State(state): State<AppState>,
    Json(modifier): Json<PriceModifier>,
) -> Result<(StatusCode, Json<PriceModifier>), AppError> {
    let saved = state.writer.save_modifier(modifier).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PUT /modifiers/{id}
async fn update_modifier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(modifier): Json<PriceModifier>,
) -> Result<Json<PriceModifier>, AppError> {
    let saved = state.writer.update_modifier(id, modifier).await?;
    Ok(Json(saved))
}

/// POST /attributes/apply
async fn apply_attribute_rules(
    Json(req): Json<ApplyAttributesRequest>,
) -> Result<Json<RuleOutcome>, AppError> {
    validate_rules(&req.attributes, &req.rules)?;
    let outcome = tariff_rules::attributes::apply(
        &req.attributes,
        &req.rules,
        &req.selected_values,
        req.quantity,
    );
    Ok(Json(outcome))
}
