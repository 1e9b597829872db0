//! Landing (session entry) rows

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "landings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub landing_id: String,
    pub timestamp: DateTimeUtc,
    #[sea_orm(column_type = "Text")]
    pub url_params: String,
    /// JSON 元数据（referrer、UA、设备、合作方等）
    #[sea_orm(column_type = "Text")]
    pub metadata: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
