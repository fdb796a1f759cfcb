//! Domain service for categories, genres, and titles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreView {
    pub name: String,
    pub slug: String,
}

/// Title as returned by the read surface. `rating` is the mean review score,
/// `None` while the title has no reviews.
#[derive(Debug, Clone, Serialize)]
pub struct TitleView {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub category: Option<CategoryView>,
    pub genres: Vec<GenreView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub category: Option<String>,
}

/// Partial title update; absent fields keep their stored value.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// # Errors
    ///
    /// [`CatalogError::Conflict`] when the slug is already taken.
    async fn create_category(&self, name: &str, slug: &str) -> Result<CategoryView, CatalogError>;

    async fn list_categories(&self) -> Result<Vec<CategoryView>, CatalogError>;

    /// Titles in the category survive with their category cleared.
    async fn delete_category(&self, slug: &str) -> Result<(), CatalogError>;

    /// # Errors
    ///
    /// [`CatalogError::Conflict`] when the slug is already taken.
    async fn create_genre(&self, name: &str, slug: &str) -> Result<GenreView, CatalogError>;

    async fn list_genres(&self) -> Result<Vec<GenreView>, CatalogError>;

    async fn delete_genre(&self, slug: &str) -> Result<(), CatalogError>;

    /// Creates a title, resolving category and genre slugs.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for a future year or an unknown slug.
    async fn create_title(&self, input: NewTitle) -> Result<TitleView, CatalogError>;

    async fn get_title(&self, id: i32) -> Result<TitleView, CatalogError>;

    async fn list_titles(&self) -> Result<Vec<TitleView>, CatalogError>;

    async fn update_title(&self, id: i32, patch: TitlePatch) -> Result<TitleView, CatalogError>;

    async fn delete_title(&self, id: i32) -> Result<(), CatalogError>;
}
