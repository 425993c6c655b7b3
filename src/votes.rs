use crate::db::models::VoteState;
use crate::engine::Action;
use crate::error::VoteError;
use crate::startup::AppState;
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

// Request/Response DTOs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: Option<String>,
    pub option_id: Option<String>,
    pub new_option: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub data: VoteState,
}

impl ActionRequest {
    /// Identity is checked before the action name, so an anonymous request
    /// with an unknown action still reports the missing name.
    pub fn into_action(self) -> Result<(Action, String), VoteError> {
        let user = self
            .user_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(VoteError::MissingIdentity)?;

        let action = match self.action.as_deref() {
            Some("vote") => Action::Cast {
                option_id: self.option_id.ok_or(VoteError::OptionNotFound)?,
            },
            Some("removeVote") => Action::Retract {
                option_id: self.option_id.ok_or(VoteError::OptionNotFound)?,
            },
            Some("addOption") => Action::AddOption {
                text: self.new_option.unwrap_or_default(),
            },
            _ => return Err(VoteError::InvalidAction),
        };

        Ok((action, user))
    }
}

/// Current state, for the first paint before the live channel delivers.
pub async fn get_votes(
    Extension(app_state): Extension<AppState>,
) -> Result<impl IntoResponse, VoteError> {
    let state = app_state.engine.current().await?;
    Ok((StatusCode::OK, Json(state)))
}

pub async fn submit_action(
    Extension(app_state): Extension<AppState>,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, VoteError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "rejected malformed action payload");
        VoteError::InvalidRequest
    })?;

    let (action, user) = payload.into_action()?;
    let state = app_state.engine.apply(action, &user).await?;

    Ok((
        StatusCode::OK,
        Json(ActionResponse {
            success: true,
            data: state,
        }),
    ))
}
