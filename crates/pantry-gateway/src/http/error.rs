use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pantry_alerts::{AlertError, SendErrorKind};
use pantry_core::PantryError;
use pantry_inventory::InventoryError;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Error half of every handler's `Result`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, "{}", self.message);
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
                code: self.code,
            }),
        )
            .into_response()
    }
}

impl From<PantryError> for ApiError {
    fn from(e: PantryError) -> Self {
        let status = match e {
            PantryError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            PantryError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.code(), e.to_string())
    }
}

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::CategoryInUse { .. } => {
                ApiError::new(StatusCode::CONFLICT, "CATEGORY_IN_USE", e.to_string())
            }
            other => PantryError::from(other).into(),
        }
    }
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        let status = match e {
            AlertError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            AlertError::Busy => StatusCode::CONFLICT,
            AlertError::Storage(_) | AlertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.code(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_PARAMETER",
                rejection.body_text(),
            ),
            other => ApiError::new(other.status(), "INVALID_REQUEST", other.body_text()),
        }
    }
}

/// `Json` body extractor whose rejections use the JSON error shape.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// HTTP status for a finished run, by how its send ended.
pub fn send_status(kind: Option<SendErrorKind>) -> StatusCode {
    match kind {
        None => StatusCode::OK,
        Some(SendErrorKind::TransportUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        Some(SendErrorKind::TransportTimeout) => StatusCode::GATEWAY_TIMEOUT,
        Some(SendErrorKind::TransportFailure) => StatusCode::BAD_GATEWAY,
    }
}
