use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Subscriber buffer is full")]
    BufferFull,
    #[error("Subscriber is gone")]
    Disconnected,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Name is required")]
    MissingIdentity,
    #[error("Option not found")]
    OptionNotFound,
    #[error("You have already voted for this option")]
    AlreadyVoted,
    #[error("You have not voted for this option")]
    NotVoted,
    #[error("Option text is required")]
    EmptyText,
    #[error("Invalid action")]
    InvalidAction,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl VoteError {
    pub fn status(&self) -> StatusCode {
        match self {
            VoteError::OptionNotFound => StatusCode::NOT_FOUND,
            VoteError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VoteError::MissingIdentity
            | VoteError::AlreadyVoted
            | VoteError::NotVoted
            | VoteError::EmptyText
            | VoteError::InvalidAction
            | VoteError::InvalidRequest => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for VoteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            VoteError::StoreUnavailable(e) => {
                tracing::error!(error = %e, "vote state store failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
