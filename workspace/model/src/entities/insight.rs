use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tone of an insight.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    #[sea_orm(string_value = "info")]
    Info,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "success")]
    Success,
}

impl InsightType {
    /// Lenient parse used for generated content; anything unknown is `Info`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warning" | "warn" | "alert" => InsightType::Warning,
            "success" | "positive" | "good" => InsightType::Success,
            _ => InsightType::Info,
        }
    }
}

/// A generated observation about a user's finances.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "insights")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub insight_type: InsightType,
    pub category: Option<String>,
    /// JSON array of related transaction ids.
    pub related_transactions: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Related transaction ids, ignoring anything in the JSON that is not an integer.
    pub fn related_transaction_ids(&self) -> Vec<i32> {
        self.related_transactions
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_i64())
                    .filter_map(|id| i32::try_from(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
