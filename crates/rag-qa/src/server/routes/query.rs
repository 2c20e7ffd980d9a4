//! Question answering endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse};

/// POST /ask - answer a question from the default collection
pub async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Result<Json<AskResponse>> {
    tracing::info!("Question: \"{}\"", request.text);

    let mut options = state.ask_defaults().clone();
    if let Some(temperature) = request.temperature {
        options.params = options.params.with_temperature(temperature);
    }

    let outcome = state.pipeline().ask(&request.text, &options).await?;
    tracing::debug!("Answer used {} chunks", outcome.chunks_used);

    Ok(Json(AskResponse {
        answer: outcome.answer.into_text(),
    }))
}
