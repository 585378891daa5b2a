use sea_orm::entity::prelude::*;
use sea_orm::DatabaseConnection;

/// Shared lookup table used to tag transactions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub color: String,
    pub icon: String,
    /// Seeded by the migrations rather than created by a user.
    #[sea_orm(default_value = "false")]
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Find a category by its exact name.
    pub async fn by_name(db: &DatabaseConnection, name: &str) -> Result<Option<Model>, DbErr> {
        Entity::find().filter(Column::Name.eq(name)).one(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;
    use sea_orm::{Database, DbBackend, Schema, Set, Statement};

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let schema = Schema::new(DbBackend::Sqlite);
        let stmt = schema.create_table_from_entity(Entity);
        let statement =
            Statement::from_string(DbBackend::Sqlite, stmt.to_string(SqliteQueryBuilder));
        db.execute(statement).await.unwrap();

        db
    }

    #[tokio::test]
    async fn test_by_name() {
        let db = setup_test_db().await;

        ActiveModel {
            name: Set("Groceries".to_string()),
            color: Set("#22C55E".to_string()),
            icon: Set("shopping-cart".to_string()),
            is_default: Set(false),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let found = Model::by_name(&db, "Groceries").await.unwrap();
        assert_eq!(found.map(|c| c.icon), Some("shopping-cart".to_string()));

        let missing = Model::by_name(&db, "groceries").await.unwrap();
        assert!(missing.is_none());
    }
}
