use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use transgate_api_types::{
    CacheHealth, HealthResponse, ModelHealth, TranslateRequest, TranslateResponse,
    TranslateTextRequest, TranslateTextResponse,
};

use crate::application::coordinator::BatchRequest;
use crate::application::health::HealthReport;
use crate::cache::CacheStatus;

use super::error::ApiError;
use super::state::ApiState;

pub async fn translate(
    State(state): State<ApiState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = BatchRequest {
        texts: payload.texts,
        caller_ids: payload.ids,
        source_locale: payload.source_lang,
        target_locale: payload.target_lang,
    };

    let result = state.coordinator.translate(request).await?;

    Ok(Json(TranslateResponse {
        translations: result.rendered(),
        failures: result.failures(),
        cached_count: result.cached_count(),
        translated_count: result.translated_count(),
        incomplete: result.is_incomplete(),
    }))
}

pub async fn translate_text(
    State(state): State<ApiState>,
    payload: Result<Json<TranslateTextRequest>, JsonRejection>,
) -> Result<Json<TranslateTextResponse>, ApiError> {
    let Json(payload) = payload?;
    let outcome = state
        .coordinator
        .translate_text(payload.text, &payload.source_lang, &payload.target_lang)
        .await?;

    Ok(Json(TranslateTextResponse {
        translation: outcome.translation,
        cached: outcome.cached,
    }))
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(health_response(state.health.report().await))
}

pub fn health_response(report: HealthReport) -> HealthResponse {
    HealthResponse {
        status: report.status().to_string(),
        service: report.service.to_string(),
        model: ModelHealth {
            loaded: report.model_loaded,
            name: report.model_name,
        },
        cache: match report.cache {
            CacheStatus::Connected => CacheHealth::Connected,
            CacheStatus::Disconnected => CacheHealth::Disconnected,
            CacheStatus::NotInitialized => CacheHealth::NotInitialized,
        },
        supported_languages: report.supported_languages,
    }
}
