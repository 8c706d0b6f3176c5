//! HTTP-facing errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doablestore::Error as StoreError;
use tracing::error;

/// Error returned by request handlers, rendered as a plain-text body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Bad or missing input, or a business rule the request breaks
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Map a store error for `op` on `id` to an HTTP error
///
/// Unexpected failures are logged in full; the client only gets a short
/// message without paths.
pub fn store_error<'a>(op: &'static str, id: &'a str) -> impl FnOnce(StoreError) -> ApiError + 'a {
    move |err| match err {
        StoreError::NotFound { kind, id } => ApiError::NotFound(format!("{kind} with id {id} does not exist")),
        StoreError::InvalidId(id) => ApiError::BadRequest(format!("invalid id {id:?}")),
        other => {
            error!(op, id, error = %other, "store operation failed");
            ApiError::Internal(format!("Error while trying to {op}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doablestore::EntityKind;

    #[test]
    fn test_store_error_mapping() {
        let err = store_error("read todo", "t1")(StoreError::NotFound {
            kind: EntityKind::Todo,
            id: "t1".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "todo with id t1 does not exist");

        let err = store_error("read todo", "..")(StoreError::InvalidId("..".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = store_error("save todo", "t1")(StoreError::Io {
            path: "/srv/sync/todos/t1.todo".into(),
            source: io,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("/srv"));
    }
}
