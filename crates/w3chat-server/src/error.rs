use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use w3chat_shared::ChatError;
use w3chat_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Rejected(ChatError),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(rejection) => ServerError::Rejected(rejection),
            other => {
                tracing::error!(error = %other, "Store failure");
                ServerError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(e: PathRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(e: QueryRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "spawn_blocking join error");
        ServerError::Internal(e.to_string())
    }
}

fn rejection_status(e: &ChatError) -> StatusCode {
    match e {
        ChatError::AlreadyRegistered | ChatError::NameTaken | ChatError::AlreadyMember(_) => {
            StatusCode::CONFLICT
        }
        ChatError::NotRegistered | ChatError::OnlyAdmin | ChatError::NotMember => {
            StatusCode::FORBIDDEN
        }
        ChatError::GroupNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::BatchTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Rejected(e) => (
                rejection_status(e),
                serde_json::json!({ "error": e.to_string(), "kind": e.kind() }),
            ),
            ServerError::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ServerError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": self.to_string() }),
            ),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Internal server error" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use w3chat_shared::GroupId;

    use super::*;

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(rejection_status(&ChatError::NameTaken), StatusCode::CONFLICT);
        assert_eq!(rejection_status(&ChatError::OnlyAdmin), StatusCode::FORBIDDEN);
        assert_eq!(
            rejection_status(&ChatError::GroupNotFound(GroupId(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(rejection_status(&ChatError::SelfMessage), StatusCode::BAD_REQUEST);
        assert_eq!(
            rejection_status(&ChatError::BatchTooLarge { len: 65, max: 64 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_storage_failures_are_opaque() {
        let err: ServerError = StoreError::Corrupt("bad timestamp".into()).into();
        assert!(matches!(err, ServerError::Internal(_)));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
