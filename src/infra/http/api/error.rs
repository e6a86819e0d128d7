use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use transgate_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::application::coordinator::TranslateError;
use crate::application::error::ErrorReport;

pub mod codes {
    pub const INVALID_BODY: &str = "invalid_body";
    pub const LENGTH_MISMATCH: &str = "length_mismatch";
    pub const TOO_MANY_ITEMS: &str = "too_many_items";
    pub const UNSUPPORTED_LOCALE: &str = "unsupported_locale";
    pub const BACKEND_UNAVAILABLE: &str = "backend_unavailable";
    pub const BACKEND_ERROR: &str = "backend_error";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(code: &'static str, message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message, hint)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<TranslateError> for ApiError {
    fn from(error: TranslateError) -> Self {
        let hint = Some(error.to_string());
        match error {
            TranslateError::LengthMismatch { .. } => Self::bad_request(
                codes::LENGTH_MISMATCH,
                "Texts and ids must have the same length",
                hint,
            ),
            TranslateError::TooManyItems { .. } => {
                Self::bad_request(codes::TOO_MANY_ITEMS, "Too many items in request", hint)
            }
            TranslateError::UnsupportedLocale(_) => {
                Self::bad_request(codes::UNSUPPORTED_LOCALE, "Unsupported language", hint)
            }
            TranslateError::BackendNotReady => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::BACKEND_UNAVAILABLE,
                "Translation model is not loaded",
                None,
            ),
            TranslateError::Backend(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::BACKEND_ERROR,
                "Translation failed",
                hint,
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            codes::INVALID_BODY,
            "Request body could not be parsed",
            Some(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}
