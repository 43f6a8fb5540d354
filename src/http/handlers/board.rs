use axum::extract::{rejection::JsonRejection, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::board::{Message, NewMessage};
use crate::error::GatewayResult;
use crate::http::handlers::invalid_body;
use crate::http::response::success;
use crate::http::server::AppState;

#[derive(Serialize)]
struct Listing {
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Created {
    message: &'static str,
    id: Uuid,
}

pub async fn list_messages(State(state): State<AppState>) -> Response {
    success(
        StatusCode::OK,
        Listing {
            messages: state.board.list().await,
        },
    )
}

pub async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> GatewayResult<Response> {
    let Json(new) = payload.map_err(invalid_body)?;
    let message = state.board.post(new).await?;

    Ok(success(
        StatusCode::CREATED,
        Created {
            message: "Message created successfully",
            id: message.id,
        },
    ))
}
