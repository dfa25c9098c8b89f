use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use remessa_core::{EnqueueError, RelayError};

use crate::http::ErrorBody;

/// Conversion from core errors to HTTP responses at the ingress boundary.
pub(crate) trait IntoApiResponse {
    fn into_api_response(self) -> Response;
}

impl IntoApiResponse for EnqueueError {
    fn into_api_response(self) -> Response {
        match self {
            // Retriable from the caller's point of view
            EnqueueError::QueueFull(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(self.to_string())),
            )
                .into_response(),
        }
    }
}

impl IntoApiResponse for RelayError {
    fn into_api_response(self) -> Response {
        let status = match self {
            RelayError::ChannelFull | RelayError::ChannelDisconnected => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::QueueSpawn(_) | RelayError::QueuePanicked => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
