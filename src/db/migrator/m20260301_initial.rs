use crate::entities::prelude::*;
use crate::entities::{reviews, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Confirmation code seeded for the default admin account. Expected to be
/// rotated by re-running signup for the admin user.
pub const DEFAULT_ADMIN_CODE: &str = "reviewd_default_setup_code_please_rotate";

/// Email seeded for the default admin account.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@localhost";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Table order follows foreign-key dependencies.
        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Categories)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Genres)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Titles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(TitleGenres)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Reviews)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Comments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One review per (title, author). Concurrent create attempts must
        // resolve here, not in application code.
        manager
            .create_index(
                Index::create()
                    .name("uq_reviews_title_author")
                    .table(Reviews)
                    .col(reviews::Column::TitleId)
                    .col(reviews::Column::AuthorId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed default admin account.
        let now = chrono::Utc::now().to_rfc3339();
        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::Email,
                users::Column::Role,
                users::Column::ConfirmationCode,
                users::Column::Confirmed,
                users::Column::IsStaff,
                users::Column::IsSuperuser,
                users::Column::DateJoined,
            ])
            .values_panic([
                "admin".into(),
                DEFAULT_ADMIN_EMAIL.into(),
                "admin".into(),
                DEFAULT_ADMIN_CODE.into(),
                false.into(),
                true.into(),
                true.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TitleGenres).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Titles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Genres).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
