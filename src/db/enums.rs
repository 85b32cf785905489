use sea_orm::entity::prelude::*;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AppStatus {
    #[sea_orm(string_value = "AVAILABLE")]
    Available,
    #[sea_orm(string_value = "UNAVAILABLE")]
    Unavailable,
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStatus::Available => write!(f, "Available"),
            AppStatus::Unavailable => write!(f, "Unavailable"),
        }
    }
}
