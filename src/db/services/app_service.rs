//! Registry operations on monitored applications.

use chrono::{DateTime, Utc};
use reqwest::Url;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db::entities::monitored_app;
use crate::db::enums::AppStatus;
use crate::error::ServiceError;
use crate::monitor::state::{next_state, ProbeOutcome, Transition};

/// Input for registering a new application.
#[derive(Debug, Clone)]
pub struct NewApp {
    pub url: String,
    pub name: String,
    pub launch_link: String,
}

/// Accepts only absolute `http`/`https` URLs with a host.
pub fn validate_http_url(raw: &str, field: &str) -> Result<Url, ServiceError> {
    let url = Url::parse(raw)
        .map_err(|e| ServiceError::Validation(format!("Invalid {field} '{raw}': {e}.")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ServiceError::Validation(format!(
            "Invalid {field} '{raw}': expected an http(s) address."
        )));
    }
    Ok(url)
}

/// All applications in stable `id` order.
pub async fn list_apps(db: &DatabaseConnection) -> Result<Vec<monitored_app::Model>, DbErr> {
    monitored_app::Entity::find()
        .order_by_asc(monitored_app::Column::Id)
        .all(db)
        .await
}

pub async fn get_app_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<monitored_app::Model>, DbErr> {
    monitored_app::Entity::find()
        .filter(monitored_app::Column::Name.eq(name))
        .one(db)
        .await
}

/// Validates and inserts a new application with status `Available` and a
/// zero retry counter.
pub async fn create_app(
    db: &DatabaseConnection,
    app: NewApp,
) -> Result<monitored_app::Model, ServiceError> {
    validate_http_url(&app.url, "URL")?;
    validate_http_url(&app.launch_link, "launch link")?;
    if app.name.trim().is_empty() {
        return Err(ServiceError::Validation("Application name must not be empty.".to_string()));
    }

    let txn = db.begin().await?;

    let existing = monitored_app::Entity::find()
        .filter(
            Condition::any()
                .add(monitored_app::Column::Url.eq(app.url.as_str()))
                .add(monitored_app::Column::Name.eq(app.name.as_str()))
                .add(monitored_app::Column::LaunchLink.eq(app.launch_link.as_str())),
        )
        .one(&txn)
        .await?;

    if let Some(existing) = existing {
        let field = if existing.url == app.url {
            format!("URL {}", app.url)
        } else if existing.name == app.name {
            format!("name {}", app.name)
        } else {
            format!("launch link {}", app.launch_link)
        };
        return Err(ServiceError::Duplicate(field));
    }

    let saved = monitored_app::ActiveModel {
        url: Set(app.url),
        name: Set(app.name),
        launch_link: Set(app.launch_link),
        status: Set(AppStatus::Available),
        last_update: Set(None),
        retry_count: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(saved)
}

/// Deletes the application with the given name. Returns whether a row was removed.
pub async fn delete_app_by_name(db: &DatabaseConnection, name: &str) -> Result<bool, DbErr> {
    let result = monitored_app::Entity::delete_many()
        .filter(monitored_app::Column::Name.eq(name))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Applies one probe outcome to an application as a single committed
/// read-modify-write.
///
/// Returns `None` when the application no longer exists (removed while the
/// cycle was running); nothing is written in that case.
pub async fn record_probe_outcome(
    db: &DatabaseConnection,
    app_id: i32,
    outcome: ProbeOutcome,
    now: DateTime<Utc>,
) -> Result<Option<(monitored_app::Model, Transition)>, DbErr> {
    let txn = db.begin().await?;

    let Some(current) = monitored_app::Entity::find_by_id(app_id).one(&txn).await? else {
        txn.commit().await?;
        return Ok(None);
    };

    let transition = next_state(current.status, current.retry_count, outcome);

    let mut active = current.into_active_model();
    active.status = Set(transition.status);
    active.retry_count = Set(transition.retry_count);
    active.last_update = Set(Some(now));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(Some((updated, transition)))
}
