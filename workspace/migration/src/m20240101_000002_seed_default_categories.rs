use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_tables::Categories;

/// Name, colour and icon of every category available to new users.
const DEFAULT_CATEGORIES: [(&str, &str, &str); 10] = [
    ("Food & Dining", "#EF4444", "utensils"),
    ("Transportation", "#F59E0B", "car"),
    ("Shopping", "#EC4899", "shopping-bag"),
    ("Entertainment", "#8B5CF6", "film"),
    ("Bills & Utilities", "#3B82F6", "file-text"),
    ("Healthcare", "#10B981", "heart"),
    ("Travel", "#06B6D4", "plane"),
    ("Education", "#6366F1", "book"),
    ("Income", "#22C55E", "trending-up"),
    ("Other", "#6B7280", "circle"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert.into_table(Categories::Table).columns([
            Categories::Name,
            Categories::Color,
            Categories::Icon,
            Categories::IsDefault,
        ]);

        for (name, color, icon) in DEFAULT_CATEGORIES {
            insert
                .values([name.into(), color.into(), icon.into(), true.into()])
                .map_err(|e| DbErr::Migration(e.to_string()))?;
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Categories::Table)
            .and_where(Expr::col(Categories::IsDefault).eq(true))
            .and_where(
                Expr::col(Categories::Name).is_in(DEFAULT_CATEGORIES.iter().map(|(name, _, _)| *name)),
            )
            .to_owned();

        manager.exec_stmt(delete).await
    }
}
