//! Anonymous message submission and the owner's accept-messages toggle.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::{
    ApiResponse,
    auth::{principal::require_auth, utils::valid_message_content},
    auth_failure, fail, ok,
};
use crate::store::DynStore;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendMessageRequest {
    /// Recipient username.
    pub username: String,
    pub content: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMessagesRequest {
    pub accept_messages: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMessagesResponse {
    pub success: bool,
    pub message: String,
    pub is_accepting_messages: bool,
}

#[utoipa::path(
    post,
    path = "/api/send-message",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = ApiResponse),
        (status = 400, description = "Validation error", body = ApiResponse),
        (status = 403, description = "Recipient is not accepting messages", body = ApiResponse),
        (status = 404, description = "Recipient not found", body = ApiResponse),
        (status = 500, description = "Message could not be stored", body = ApiResponse)
    ),
    tag = "truefeedback"
)]
#[instrument(skip(store, payload))]
pub async fn send_message(
    store: Extension<DynStore>,
    payload: Option<Json<SendMessageRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "Missing payload");
    };
    if !valid_message_content(&request.content) {
        return fail(
            StatusCode::BAD_REQUEST,
            "Content must be between 10 and 300 characters",
        );
    }

    let recipient = match store.find_user_by_username(request.username.trim()).await {
        Ok(Some(user)) if user.is_verified => user,
        Ok(_) => return fail(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Recipient lookup failed: {err:#}");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "Error sending message");
        }
    };
    if !recipient.is_accepting_messages {
        return fail(StatusCode::FORBIDDEN, "User is not accepting messages");
    }

    match store
        .insert_message(recipient.id, request.content.trim())
        .await
    {
        Ok(message) => {
            info!(message_id = %message.id, "message stored");
            ok(StatusCode::CREATED, "Message sent successfully")
        }
        Err(err) => {
            error!("Failed to store message: {err:#}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Error sending message")
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/accept-messages",
    responses(
        (status = 200, description = "Current accept-messages flag", body = AcceptMessagesResponse),
        (status = 401, description = "Not signed in", body = ApiResponse),
        (status = 404, description = "User not found", body = ApiResponse)
    ),
    tag = "truefeedback"
)]
#[instrument(skip(headers, store))]
pub async fn get_accept_messages(
    headers: HeaderMap,
    store: Extension<DynStore>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &store).await {
        Ok(principal) => principal,
        Err(status) => return auth_failure(status),
    };
    match store.find_user_by_username(&principal.username).await {
        Ok(Some(user)) => accept_messages_response(
            "Fetched accept-messages status",
            user.is_accepting_messages,
        ),
        Ok(None) => fail(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to read accept-messages flag: {err:#}");
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving accept-messages status",
            )
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/accept-messages",
    request_body = AcceptMessagesRequest,
    responses(
        (status = 200, description = "Flag updated", body = AcceptMessagesResponse),
        (status = 400, description = "Missing payload", body = ApiResponse),
        (status = 401, description = "Not signed in", body = ApiResponse),
        (status = 404, description = "User not found", body = ApiResponse),
        (status = 500, description = "Update failed", body = ApiResponse)
    ),
    tag = "truefeedback"
)]
#[instrument(skip(headers, store, payload))]
pub async fn set_accept_messages(
    headers: HeaderMap,
    store: Extension<DynStore>,
    payload: Option<Json<AcceptMessagesRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &store).await {
        Ok(principal) => principal,
        Err(status) => return auth_failure(status),
    };
    let Some(Json(request)) = payload else {
        return fail(StatusCode::BAD_REQUEST, "Missing payload");
    };

    match store
        .set_accepting_messages(principal.user_id, request.accept_messages)
        .await
    {
        Ok(true) => accept_messages_response(
            "Message acceptance status updated successfully",
            request.accept_messages,
        ),
        Ok(false) => fail(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to update accept-messages flag: {err:#}");
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating message acceptance status",
            )
        }
    }
}

fn accept_messages_response(message: &str, accepting: bool) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(AcceptMessagesResponse {
            success: true,
            message: message.to_string(),
            is_accepting_messages: accepting,
        }),
    )
        .into_response()
}
