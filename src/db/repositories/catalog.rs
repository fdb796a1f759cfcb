use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{categories, genres, title_genres, titles};

/// Repository for categories, genres, titles, and the genre bridge.
pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// The unique slug index settles duplicate slugs; callers translate the
    /// violation.
    pub async fn insert_category(
        &self,
        name: &str,
        slug: &str,
    ) -> std::result::Result<categories::Model, DbErr> {
        let model = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };
        model.insert(&self.conn).await
    }

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        categories::Entity::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query category by slug")
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category by ID")
    }

    /// Titles referencing the category keep existing; the FK nulls them.
    pub async fn delete_category_by_slug(&self, slug: &str) -> Result<bool> {
        let result = categories::Entity::delete_many()
            .filter(categories::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Genres
    // ========================================================================

    pub async fn insert_genre(
        &self,
        name: &str,
        slug: &str,
    ) -> std::result::Result<genres::Model, DbErr> {
        let model = genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };
        model.insert(&self.conn).await
    }

    pub async fn list_genres(&self) -> Result<Vec<genres::Model>> {
        genres::Entity::find()
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list genres")
    }

    pub async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        genres::Entity::find()
            .filter(genres::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query genre by slug")
    }

    pub async fn delete_genre_by_slug(&self, slug: &str) -> Result<bool> {
        let result = genres::Entity::delete_many()
            .filter(genres::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete genre")?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Titles
    // ========================================================================

    pub async fn insert_title(
        &self,
        name: &str,
        year: i32,
        description: Option<String>,
        category_id: Option<i32>,
    ) -> Result<titles::Model> {
        let model = titles::ActiveModel {
            name: Set(name.to_string()),
            year: Set(year),
            description: Set(description),
            category_id: Set(category_id),
            ..Default::default()
        };
        model
            .insert(&self.conn)
            .await
            .context("Failed to insert title")
    }

    pub async fn get_title(&self, id: i32) -> Result<Option<titles::Model>> {
        titles::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query title by ID")
    }

    pub async fn list_titles(&self) -> Result<Vec<titles::Model>> {
        titles::Entity::find()
            .order_by_asc(titles::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list titles")
    }

    pub async fn update_title(
        &self,
        title: titles::Model,
        name: Option<String>,
        year: Option<i32>,
        description: Option<Option<String>>,
        category_id: Option<Option<i32>>,
    ) -> Result<titles::Model> {
        let mut active: titles::ActiveModel = title.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(year) = year {
            active.year = Set(year);
        }
        if let Some(description) = description {
            active.description = Set(description);
        }
        if let Some(category_id) = category_id {
            active.category_id = Set(category_id);
        }

        active
            .update(&self.conn)
            .await
            .context("Failed to update title")
    }

    pub async fn delete_title(&self, id: i32) -> Result<bool> {
        let result = titles::Entity::delete_many()
            .filter(titles::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete title")?;

        Ok(result.rows_affected > 0)
    }

    /// Replaces the title's genre associations.
    pub async fn set_title_genres(&self, title_id: i32, genre_ids: &[i32]) -> Result<()> {
        title_genres::Entity::delete_many()
            .filter(title_genres::Column::TitleId.eq(title_id))
            .exec(&self.conn)
            .await
            .context("Failed to clear title genres")?;

        if genre_ids.is_empty() {
            return Ok(());
        }

        let rows = genre_ids.iter().map(|genre_id| title_genres::ActiveModel {
            title_id: Set(title_id),
            genre_id: Set(*genre_id),
        });
        title_genres::Entity::insert_many(rows)
            .exec(&self.conn)
            .await
            .context("Failed to insert title genres")?;

        Ok(())
    }

    pub async fn genres_for_title(&self, title: &titles::Model) -> Result<Vec<genres::Model>> {
        title
            .find_related(genres::Entity)
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to query genres for title")
    }
}
