use sea_orm::{DbErr, SqlErr};
use tracing::info;

use crate::db::Store;
use crate::entities::{comments, reviews};
use crate::services::review_service::{CommentView, ReviewError, ReviewService, ReviewView};

const MIN_SCORE: i32 = 1;
const MAX_SCORE: i32 = 10;

pub struct SeaOrmReviewServiceImpl {
    store: Store,
}

impl SeaOrmReviewServiceImpl {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn author_name(&self, author_id: i32) -> Result<String, ReviewError> {
        let user = self
            .store
            .users()
            .get_by_id(author_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?
            .ok_or_else(|| ReviewError::Database(format!("Author {author_id} missing")))?;
        Ok(user.username)
    }

    async fn review_view(&self, review: &reviews::Model) -> Result<ReviewView, ReviewError> {
        Ok(ReviewView {
            id: review.id,
            author: self.author_name(review.author_id).await?,
            text: review.text.clone(),
            score: review.score,
            pub_date: review.pub_date.clone(),
        })
    }

    async fn comment_view(&self, comment: &comments::Model) -> Result<CommentView, ReviewError> {
        Ok(CommentView {
            id: comment.id,
            author: self.author_name(comment.author_id).await?,
            text: comment.text.clone(),
            pub_date: comment.pub_date.clone(),
        })
    }

    async fn ensure_title(&self, title_id: i32) -> Result<(), ReviewError> {
        self.store
            .catalog()
            .get_title(title_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?
            .ok_or_else(|| ReviewError::NotFound(format!("Title {title_id} not found")))?;
        Ok(())
    }

    /// Resolves a review scoped to its title.
    async fn resolve_review(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<reviews::Model, ReviewError> {
        self.ensure_title(title_id).await?;
        self.store
            .reviews()
            .get_for_title(review_id, title_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?
            .ok_or_else(|| {
                ReviewError::NotFound(format!("Review {review_id} not found for title {title_id}"))
            })
    }

    /// Resolves a comment scoped to its review (which is scoped to its title).
    async fn resolve_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<comments::Model, ReviewError> {
        self.resolve_review(title_id, review_id).await?;
        self.store
            .reviews()
            .get_comment_for_review(comment_id, review_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?
            .ok_or_else(|| {
                ReviewError::NotFound(format!(
                    "Comment {comment_id} not found for review {review_id}"
                ))
            })
    }
}

fn validate_score(score: i32) -> Result<(), ReviewError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(ReviewError::Validation(format!(
            "Score must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )))
    }
}

fn validate_text(text: &str) -> Result<(), ReviewError> {
    if text.is_empty() {
        return Err(ReviewError::Validation("Text must not be empty".to_string()));
    }
    Ok(())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait::async_trait]
impl ReviewService for SeaOrmReviewServiceImpl {
    async fn create_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i32,
    ) -> Result<ReviewView, ReviewError> {
        self.ensure_title(title_id).await?;
        validate_text(text)?;
        validate_score(score)?;

        let repo = self.store.reviews();
        if repo
            .get_by_author_and_title(author_id, title_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?
            .is_some()
        {
            return Err(ReviewError::Conflict(
                "You have already reviewed this title".to_string(),
            ));
        }

        let created = match repo.insert_review(title_id, author_id, text, score).await {
            Ok(review) => review,
            // Lost a race against a concurrent review by the same author.
            Err(err) if is_unique_violation(&err) => {
                return Err(ReviewError::Conflict(
                    "You have already reviewed this title".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        info!(title_id, review_id = created.id, "Review created");
        self.review_view(&created).await
    }

    async fn get_review(&self, title_id: i32, review_id: i32) -> Result<ReviewView, ReviewError> {
        let review = self.resolve_review(title_id, review_id).await?;
        self.review_view(&review).await
    }

    async fn review_author(&self, title_id: i32, review_id: i32) -> Result<i32, ReviewError> {
        let review = self.resolve_review(title_id, review_id).await?;
        Ok(review.author_id)
    }

    async fn list_reviews(&self, title_id: i32) -> Result<Vec<ReviewView>, ReviewError> {
        self.ensure_title(title_id).await?;
        let reviews = self
            .store
            .reviews()
            .list_for_title(title_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        let mut views = Vec::with_capacity(reviews.len());
        for review in &reviews {
            views.push(self.review_view(review).await?);
        }
        Ok(views)
    }

    async fn update_review(
        &self,
        title_id: i32,
        review_id: i32,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<ReviewView, ReviewError> {
        if let Some(text) = &text {
            validate_text(text)?;
        }
        if let Some(score) = score {
            validate_score(score)?;
        }

        let review = self.resolve_review(title_id, review_id).await?;
        let updated = self
            .store
            .reviews()
            .update_review(review, text, score)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        self.review_view(&updated).await
    }

    async fn delete_review(&self, title_id: i32, review_id: i32) -> Result<(), ReviewError> {
        let review = self.resolve_review(title_id, review_id).await?;
        self.store
            .reviews()
            .delete_review(review.id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        info!(title_id, review_id, "Review deleted");
        Ok(())
    }

    async fn create_comment(
        &self,
        title_id: i32,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<CommentView, ReviewError> {
        validate_text(text)?;
        self.resolve_review(title_id, review_id).await?;

        let created = self
            .store
            .reviews()
            .insert_comment(review_id, author_id, text)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        info!(review_id, comment_id = created.id, "Comment created");
        self.comment_view(&created).await
    }

    async fn get_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<CommentView, ReviewError> {
        let comment = self.resolve_comment(title_id, review_id, comment_id).await?;
        self.comment_view(&comment).await
    }

    async fn comment_author(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<i32, ReviewError> {
        let comment = self.resolve_comment(title_id, review_id, comment_id).await?;
        Ok(comment.author_id)
    }

    async fn list_comments(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Vec<CommentView>, ReviewError> {
        self.resolve_review(title_id, review_id).await?;
        let comments = self
            .store
            .reviews()
            .list_for_review(review_id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in &comments {
            views.push(self.comment_view(comment).await?);
        }
        Ok(views)
    }

    async fn update_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
        text: String,
    ) -> Result<CommentView, ReviewError> {
        validate_text(&text)?;
        let comment = self.resolve_comment(title_id, review_id, comment_id).await?;
        let updated = self
            .store
            .reviews()
            .update_comment(comment, text)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        self.comment_view(&updated).await
    }

    async fn delete_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<(), ReviewError> {
        let comment = self.resolve_comment(title_id, review_id, comment_id).await?;
        self.store
            .reviews()
            .delete_comment(comment.id)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        info!(review_id, comment_id, "Comment deleted");
        Ok(())
    }
}
