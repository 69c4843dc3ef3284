use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors a request/response call can surface to its caller.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("game not found")]
    NotFound,
    #[error("missing or invalid parameter: {0}")]
    InvalidArgument(String),
    #[error("game already has two players")]
    SessionFull,
    #[error("token generation failed")]
    Unavailable,
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::NotFound => StatusCode::NOT_FOUND,
            GameError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            GameError::SessionFull => StatusCode::CONFLICT,
            GameError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<QueryRejection> for GameError {
    fn from(rejection: QueryRejection) -> Self {
        GameError::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(GameError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::InvalidArgument("name".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GameError::SessionFull.status(), StatusCode::CONFLICT);
        assert_eq!(GameError::Unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn message_names_the_parameter() {
        assert_eq!(
            GameError::InvalidArgument("gameID".into()).to_string(),
            "missing or invalid parameter: gameID"
        );
    }
}
