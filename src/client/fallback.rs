//! Loading placeholder and view model for the feedback page.

use super::{ApiClient, AppError};
use crate::{api::handlers::feedbacks::FeedbacksResponse, store::Message};
use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

pub const SKELETON_CARDS: usize = 3;
pub const SKELETON_CARD_HEIGHT: u16 = 150;
const MEDIUM_BREAKPOINT: u32 = 768;
const LARGE_BREAKPOINT: u32 = 1024;

pub const LOAD_FAILED: &str = "Failed to load feedbacks";

/// Three fixed-height cards laid out in one, two or three columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackFallback;

impl FeedbackFallback {
    #[must_use]
    pub const fn cards(self) -> usize {
        SKELETON_CARDS
    }

    #[must_use]
    pub const fn card_height(self) -> u16 {
        SKELETON_CARD_HEIGHT
    }

    /// Column count for a viewport `width` in CSS pixels.
    #[must_use]
    pub const fn columns(self, width: u32) -> usize {
        if width >= LARGE_BREAKPOINT {
            3
        } else if width >= MEDIUM_BREAKPOINT {
            2
        } else {
            1
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedbackView {
    Loading(FeedbackFallback),
    Loaded(Vec<Message>),
    Failed(String),
}

impl Default for FeedbackView {
    fn default() -> Self {
        Self::Loading(FeedbackFallback)
    }
}

#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn feedbacks(&self, page: u32) -> Result<FeedbacksResponse, AppError>;
}

#[async_trait]
impl FeedbackSource for ApiClient {
    async fn feedbacks(&self, page: u32) -> Result<FeedbacksResponse, AppError> {
        self.get_feedbacks(page).await
    }
}

impl FeedbackView {
    /// Fetch one page and settle into `Loaded` or `Failed`.
    pub async fn load(source: &dyn FeedbackSource, page: u32) -> Self {
        match source.feedbacks(page).await {
            Ok(response) if response.success => Self::Loaded(response.feedbacks),
            Ok(response) => Self::Failed(response.message),
            Err(err) => {
                warn!(error = %err, page, "failed to load feedbacks");
                match err {
                    AppError::Http { status: 401, .. } => {
                        Self::Failed("user not authenticated".to_string())
                    }
                    _ => Self::Failed(LOAD_FAILED.to_string()),
                }
            }
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }
}
