use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::admin::channel::ReplyKind;
use crate::admin::AdminState;
use crate::usage::UsageSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub result: bool,
    pub version: &'static str,
    pub status: &'static str,
    pub accounts: usize,
    pub usage: UsageSnapshot,
}

/// A command relayed by a transport on behalf of `identity`.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub identity: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub result: bool,
    pub message: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        result: true,
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        accounts: state.keys.len(),
        usage: state.usage.snapshot(),
    })
}

pub async fn post_command(
    State(state): State<AdminState>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let reply = state.channel.handle(&request.identity, &request.text).await;
    let status = match reply.kind {
        ReplyKind::Done => StatusCode::OK,
        ReplyKind::Refused => StatusCode::FORBIDDEN,
        ReplyKind::Invalid => StatusCode::BAD_REQUEST,
    };

    (
        status,
        Json(CommandResponse {
            result: reply.is_ok(),
            message: reply.text,
        }),
    )
}
