//! Outbound partner click rows

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rental_clicks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub click_id: String,
    pub landing_id: Option<String>,
    pub partner: String,
    pub iata_code: Option<String>,
    pub location_id: Option<String>,
    pub pickup_date_new: String,
    pub pickup_time_new: String,
    pub dropoff_date_new: String,
    pub dropoff_time_new: String,
    pub timestamp: DateTimeUtc,
    pub placement: String,
    #[sea_orm(column_type = "Text")]
    pub redirect_url: String,
    /// JSON 对象（访客页面 query 参数）
    #[sea_orm(column_type = "Text")]
    pub search_params: String,
    pub auto_params: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
