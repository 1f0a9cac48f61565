use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Read-only product view supplied by the catalog collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfile {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// attribute type -> values the product carries
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}
