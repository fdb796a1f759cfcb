use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{comments, reviews};

#[derive(FromQueryResult)]
struct RatingRow {
    rating: Option<f64>,
}

/// Repository for reviews, their comments, and the rating aggregate.
pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// The composite unique index on (title, author) settles concurrent
    /// inserts; callers translate the violation into a conflict.
    pub async fn insert_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i32,
    ) -> std::result::Result<reviews::Model, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = reviews::ActiveModel {
            title_id: Set(title_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            score: Set(score),
            pub_date: Set(now),
            ..Default::default()
        };
        model.insert(&self.conn).await
    }

    pub async fn get_by_author_and_title(
        &self,
        author_id: i32,
        title_id: i32,
    ) -> Result<Option<reviews::Model>> {
        reviews::Entity::find()
            .filter(reviews::Column::AuthorId.eq(author_id))
            .filter(reviews::Column::TitleId.eq(title_id))
            .one(&self.conn)
            .await
            .context("Failed to query review by author and title")
    }

    /// Looks the review up within the title, so a review ID from a different
    /// title resolves to nothing.
    pub async fn get_for_title(
        &self,
        review_id: i32,
        title_id: i32,
    ) -> Result<Option<reviews::Model>> {
        reviews::Entity::find_by_id(review_id)
            .filter(reviews::Column::TitleId.eq(title_id))
            .one(&self.conn)
            .await
            .context("Failed to query review")
    }

    pub async fn list_for_title(&self, title_id: i32) -> Result<Vec<reviews::Model>> {
        reviews::Entity::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .order_by_desc(reviews::Column::PubDate)
            .all(&self.conn)
            .await
            .context("Failed to list reviews")
    }

    /// `pub_date` is immutable and stays untouched.
    pub async fn update_review(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<reviews::Model> {
        let mut active: reviews::ActiveModel = review.into();
        if let Some(text) = text {
            active.text = Set(text);
        }
        if let Some(score) = score {
            active.score = Set(score);
        }

        active
            .update(&self.conn)
            .await
            .context("Failed to update review")
    }

    pub async fn delete_review(&self, id: i32) -> Result<bool> {
        let result = reviews::Entity::delete_many()
            .filter(reviews::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete review")?;

        Ok(result.rows_affected > 0)
    }

    /// Mean score across the title's reviews, recomputed on every call.
    /// `None` when the title has no reviews.
    pub async fn average_score(&self, title_id: i32) -> Result<Option<f64>> {
        let row = reviews::Entity::find()
            .select_only()
            .expr_as(Func::avg(Expr::col(reviews::Column::Score)), "rating")
            .filter(reviews::Column::TitleId.eq(title_id))
            .into_model::<RatingRow>()
            .one(&self.conn)
            .await
            .context("Failed to compute title rating")?;

        Ok(row.and_then(|r| r.rating))
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub async fn insert_comment(
        &self,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<comments::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = comments::ActiveModel {
            review_id: Set(review_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            pub_date: Set(now),
            ..Default::default()
        };
        model
            .insert(&self.conn)
            .await
            .context("Failed to insert comment")
    }

    pub async fn get_comment_for_review(
        &self,
        comment_id: i32,
        review_id: i32,
    ) -> Result<Option<comments::Model>> {
        comments::Entity::find_by_id(comment_id)
            .filter(comments::Column::ReviewId.eq(review_id))
            .one(&self.conn)
            .await
            .context("Failed to query comment")
    }

    pub async fn list_for_review(&self, review_id: i32) -> Result<Vec<comments::Model>> {
        comments::Entity::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .order_by_desc(comments::Column::PubDate)
            .all(&self.conn)
            .await
            .context("Failed to list comments")
    }

    pub async fn update_comment(
        &self,
        comment: comments::Model,
        text: String,
    ) -> Result<comments::Model> {
        let mut active: comments::ActiveModel = comment.into();
        active.text = Set(text);

        active
            .update(&self.conn)
            .await
            .context("Failed to update comment")
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool> {
        let result = comments::Entity::delete_many()
            .filter(comments::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete comment")?;

        Ok(result.rows_affected > 0)
    }
}
