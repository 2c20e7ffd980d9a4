//! Collection metadata endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::CollectionInfo;

#[derive(Debug, Deserialize)]
pub struct CollectionParams {
    /// Collection to describe (defaults to the configured one)
    pub collection_name: Option<String>,
}

/// GET /collectioninfo - describe a collection
pub async fn collection_info(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
) -> Result<Json<CollectionInfo>> {
    let collection = params
        .collection_name
        .unwrap_or_else(|| state.ask_defaults().collection.clone());

    let info = state.pipeline().describe(&collection).await?;
    Ok(Json(info))
}
