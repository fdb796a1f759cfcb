//! Domain service for reviews and their comments.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for ReviewError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: i32,
    pub author: String,
    pub text: String,
    pub score: i32,
    pub pub_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub author: String,
    pub text: String,
    pub pub_date: String,
}

/// One review per author per title; the mean score feeds the title rating.
#[async_trait::async_trait]
pub trait ReviewService: Send + Sync {
    /// # Errors
    ///
    /// [`ReviewError::NotFound`] for an unknown title;
    /// [`ReviewError::Validation`] for a score outside 1..=10;
    /// [`ReviewError::Conflict`] when the author already reviewed the title.
    async fn create_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i32,
    ) -> Result<ReviewView, ReviewError>;

    async fn get_review(&self, title_id: i32, review_id: i32) -> Result<ReviewView, ReviewError>;

    /// The owning author's ID, for object-level authorization.
    async fn review_author(&self, title_id: i32, review_id: i32) -> Result<i32, ReviewError>;

    async fn list_reviews(&self, title_id: i32) -> Result<Vec<ReviewView>, ReviewError>;

    /// Editing an existing review never trips the one-per-title rule.
    async fn update_review(
        &self,
        title_id: i32,
        review_id: i32,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<ReviewView, ReviewError>;

    async fn delete_review(&self, title_id: i32, review_id: i32) -> Result<(), ReviewError>;

    async fn create_comment(
        &self,
        title_id: i32,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<CommentView, ReviewError>;

    async fn get_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<CommentView, ReviewError>;

    /// The owning author's ID, for object-level authorization.
    async fn comment_author(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<i32, ReviewError>;

    async fn list_comments(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Vec<CommentView>, ReviewError>;

    async fn update_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
        text: String,
    ) -> Result<CommentView, ReviewError>;

    async fn delete_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<(), ReviewError>;
}
