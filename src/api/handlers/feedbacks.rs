//! Paginated feedback retrieval for the signed-in user.

use axum::{
    Json,
    extract::{Extension, RawQuery},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info_span, instrument};
use utoipa::ToSchema;

use super::{ApiResponse, auth::principal::require_auth, auth_failure, fail};
use crate::store::{DynStore, Message, Page};

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedbacksResponse {
    pub success: bool,
    pub message: String,
    pub feedbacks: Vec<Message>,
}

#[utoipa::path(
    get,
    path = "/api/get-feedbacks",
    params(
        ("page" = Option<String>, Query, description = "One-based page number, 9 messages per page")
    ),
    responses(
        (status = 200, description = "Page of messages, newest first", body = FeedbacksResponse),
        (status = 401, description = "Not signed in", body = ApiResponse),
        (status = 500, description = "Retrieval failed", body = ApiResponse)
    ),
    tag = "truefeedback"
)]
#[instrument(skip(headers, store, query))]
pub async fn get_feedbacks(
    headers: HeaderMap,
    store: Extension<DynStore>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &store).await {
        Ok(principal) => principal,
        Err(status) => return auth_failure(status),
    };

    let page = page_from_query(query.as_deref());
    let span = info_span!(
        "db.query",
        db.operation = "list_messages",
        page = page.number()
    );

    match store
        .list_messages(principal.user_id, page)
        .instrument(span)
        .await
    {
        Ok(feedbacks) => (
            StatusCode::OK,
            Json(FeedbacksResponse {
                success: true,
                message: "Successfully fetched feedbacks.".to_string(),
                feedbacks,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to list messages: {err:#}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "error retrieving messages.")
        }
    }
}

/// First `page` parameter of the raw query string.
fn page_from_query(query: Option<&str>) -> Page {
    query
        .and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "page")
                .map(|(_, value)| parse_page(&value))
        })
        .unwrap_or(Page::FIRST)
}

/// Leading-integer parse: optional whitespace and sign, then digits.
///
/// Anything that does not yield a positive number is page 1; very large values
/// saturate and simply return an empty page.
fn parse_page(raw: &str) -> Page {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    if negative || digits.is_empty() {
        return Page::FIRST;
    }
    let number = digits.bytes().fold(0u32, |acc, digit| {
        acc.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
    });
    Page::new(number)
}
