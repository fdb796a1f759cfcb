use chrono::Datelike;
use sea_orm::{DbErr, SqlErr};
use tracing::info;

use crate::db::Store;
use crate::entities::{categories, genres, titles};
use crate::services::catalog_service::{
    CatalogError, CatalogService, CategoryView, GenreView, NewTitle, TitlePatch, TitleView,
};

const MAX_NAME_LEN: usize = 256;
const MAX_SLUG_LEN: usize = 50;

pub struct SeaOrmCatalogServiceImpl {
    store: Store,
}

impl SeaOrmCatalogServiceImpl {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    fn category_view(model: &categories::Model) -> CategoryView {
        CategoryView {
            name: model.name.clone(),
            slug: model.slug.clone(),
        }
    }

    fn genre_view(model: &genres::Model) -> GenreView {
        GenreView {
            name: model.name.clone(),
            slug: model.slug.clone(),
        }
    }

    /// Assembles the full title view, including the freshly computed rating.
    async fn title_view(&self, title: &titles::Model) -> Result<TitleView, CatalogError> {
        let catalog = self.store.catalog();

        let category = match title.category_id {
            Some(id) => catalog
                .get_category(id)
                .await
                .map_err(|e| CatalogError::Database(e.to_string()))?
                .as_ref()
                .map(Self::category_view),
            None => None,
        };
        let genres = catalog
            .genres_for_title(title)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let rating = self
            .store
            .reviews()
            .average_score(title.id)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(TitleView {
            id: title.id,
            name: title.name.clone(),
            year: title.year,
            description: title.description.clone(),
            rating,
            category,
            genres: genres.iter().map(Self::genre_view).collect(),
        })
    }

    async fn resolve_category(&self, slug: &str) -> Result<i32, CatalogError> {
        self.store
            .catalog()
            .get_category_by_slug(slug)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?
            .map(|c| c.id)
            .ok_or_else(|| CatalogError::Validation(format!("Unknown category '{slug}'")))
    }

    async fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<i32>, CatalogError> {
        let catalog = self.store.catalog();
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let genre = catalog
                .get_genre_by_slug(slug)
                .await
                .map_err(|e| CatalogError::Database(e.to_string()))?
                .ok_or_else(|| CatalogError::Validation(format!("Unknown genre '{slug}'")))?;
            ids.push(genre.id);
        }
        Ok(ids)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() {
        return Err(CatalogError::Validation("Name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CatalogError::Validation(format!(
            "Name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), CatalogError> {
    if slug.is_empty() {
        return Err(CatalogError::Validation("Slug must not be empty".to_string()));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CatalogError::Validation(format!(
            "Slug must be at most {MAX_SLUG_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_'))
    {
        return Err(CatalogError::Validation(
            "Slug may only contain lowercase letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

/// Publication years may not lie in the future.
fn validate_year(year: i32) -> Result<(), CatalogError> {
    let current = chrono::Utc::now().year();
    if year > current {
        return Err(CatalogError::Validation(format!(
            "Year {year} is in the future (current year is {current})"
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogService for SeaOrmCatalogServiceImpl {
    async fn create_category(&self, name: &str, slug: &str) -> Result<CategoryView, CatalogError> {
        validate_name(name)?;
        validate_slug(slug)?;

        match self.store.catalog().insert_category(name, slug).await {
            Ok(created) => {
                info!(slug, "Category created");
                Ok(Self::category_view(&created))
            }
            Err(err) if is_unique_violation(&err) => Err(CatalogError::Conflict(format!(
                "Category slug '{slug}' already exists"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_categories(&self) -> Result<Vec<CategoryView>, CatalogError> {
        let categories = self
            .store
            .catalog()
            .list_categories()
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(categories.iter().map(Self::category_view).collect())
    }

    async fn delete_category(&self, slug: &str) -> Result<(), CatalogError> {
        let deleted = self
            .store
            .catalog()
            .delete_category_by_slug(slug)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if deleted {
            info!(slug, "Category deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("Category '{slug}' not found")))
        }
    }

    async fn create_genre(&self, name: &str, slug: &str) -> Result<GenreView, CatalogError> {
        validate_name(name)?;
        validate_slug(slug)?;

        match self.store.catalog().insert_genre(name, slug).await {
            Ok(created) => {
                info!(slug, "Genre created");
                Ok(Self::genre_view(&created))
            }
            Err(err) if is_unique_violation(&err) => Err(CatalogError::Conflict(format!(
                "Genre slug '{slug}' already exists"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_genres(&self) -> Result<Vec<GenreView>, CatalogError> {
        let genres = self
            .store
            .catalog()
            .list_genres()
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(genres.iter().map(Self::genre_view).collect())
    }

    async fn delete_genre(&self, slug: &str) -> Result<(), CatalogError> {
        let deleted = self
            .store
            .catalog()
            .delete_genre_by_slug(slug)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if deleted {
            info!(slug, "Genre deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("Genre '{slug}' not found")))
        }
    }

    async fn create_title(&self, input: NewTitle) -> Result<TitleView, CatalogError> {
        validate_name(&input.name)?;
        validate_year(input.year)?;

        let category_id = match &input.category {
            Some(slug) => Some(self.resolve_category(slug).await?),
            None => None,
        };
        let genre_ids = self.resolve_genres(&input.genre).await?;

        let catalog = self.store.catalog();
        let created = catalog
            .insert_title(&input.name, input.year, input.description, category_id)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        catalog
            .set_title_genres(created.id, &genre_ids)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        info!(title_id = created.id, name = created.name, "Title created");
        self.title_view(&created).await
    }

    async fn get_title(&self, id: i32) -> Result<TitleView, CatalogError> {
        let title = self
            .store
            .catalog()
            .get_title(id)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?
            .ok_or_else(|| CatalogError::NotFound(format!("Title {id} not found")))?;

        self.title_view(&title).await
    }

    async fn list_titles(&self) -> Result<Vec<TitleView>, CatalogError> {
        let titles = self
            .store
            .catalog()
            .list_titles()
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut views = Vec::with_capacity(titles.len());
        for title in &titles {
            views.push(self.title_view(title).await?);
        }
        Ok(views)
    }

    async fn update_title(&self, id: i32, patch: TitlePatch) -> Result<TitleView, CatalogError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(year) = patch.year {
            validate_year(year)?;
        }

        let catalog = self.store.catalog();
        let title = catalog
            .get_title(id)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?
            .ok_or_else(|| CatalogError::NotFound(format!("Title {id} not found")))?;

        let category_id = match &patch.category {
            Some(slug) => Some(Some(self.resolve_category(slug).await?)),
            None => None,
        };
        let genre_ids = match &patch.genre {
            Some(slugs) => Some(self.resolve_genres(slugs).await?),
            None => None,
        };

        let updated = catalog
            .update_title(
                title,
                patch.name,
                patch.year,
                patch.description.map(Some),
                category_id,
            )
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        if let Some(genre_ids) = genre_ids {
            catalog
                .set_title_genres(id, &genre_ids)
                .await
                .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        self.title_view(&updated).await
    }

    async fn delete_title(&self, id: i32) -> Result<(), CatalogError> {
        let deleted = self
            .store
            .catalog()
            .delete_title(id)
            .await
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        if deleted {
            info!(title_id = id, "Title deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("Title {id} not found")))
        }
    }
}
