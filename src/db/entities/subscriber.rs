use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subscribers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Recipient identifier on the chat transport.
    #[sea_orm(unique)]
    pub chat_ref: String,
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,
    pub is_admin: bool,
}

// Subscribers are standalone rows; nothing references them.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
