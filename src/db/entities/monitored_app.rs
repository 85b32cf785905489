use sea_orm::entity::prelude::*;

use crate::db::enums::AppStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "apps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub url: String,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub launch_link: String,
    pub status: AppStatus,
    pub last_update: Option<ChronoDateTimeUtc>,
    pub retry_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
