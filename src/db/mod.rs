pub mod entities;
pub mod enums;
pub mod services;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use self::entities::{monitored_app, subscriber};

/// Opens the registry database and makes sure both tables exist.
/// SQLite has a single writer, so the pool holds one connection and
/// transactions queue for it instead of failing with `SQLITE_BUSY`.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates the `apps` and `subscribers` tables from the entity definitions
/// if they are not there yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let apps = schema
        .create_table_from_entity(monitored_app::Entity)
        .if_not_exists()
        .to_owned();
    let subscribers = schema
        .create_table_from_entity(subscriber::Entity)
        .if_not_exists()
        .to_owned();

    db.execute(backend.build(&apps)).await?;
    db.execute(backend.build(&subscribers)).await?;
    info!("Registry tables are ready.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::services::{
        create_app, get_subscriber, grant_admin_if_token_matches, record_probe_outcome,
        store_token, NewApp,
    };
    use crate::monitor::ProbeOutcome;
    use crate::test_support::test_db;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cycle_write_and_elevation_run_side_by_side() {
        let (db, _dir) = test_db().await;
        let app_id = create_app(
            &db,
            NewApp {
                url: "http://a.test".to_string(),
                name: "A".to_string(),
                launch_link: "http://a.test/launch".to_string(),
            },
        )
        .await
        .unwrap()
        .id;
        store_token(&db, "chat1", "token-1").await.unwrap();

        for round in 0..50 {
            let outcome = if round % 2 == 0 {
                ProbeOutcome::Unreachable
            } else {
                ProbeOutcome::Reachable
            };
            let cycle = tokio::spawn({
                let db = db.clone();
                async move { record_probe_outcome(&db, app_id, outcome, Utc::now()).await }
            });
            let elevate = tokio::spawn({
                let db = db.clone();
                async move { grant_admin_if_token_matches(&db, "chat1", "token-1").await }
            });

            let (cycle, elevate) = tokio::join!(cycle, elevate);
            assert!(cycle.unwrap().unwrap().is_some(), "round {round}: cycle write failed");
            assert!(elevate.unwrap().unwrap(), "round {round}: elevation failed");
        }

        assert!(get_subscriber(&db, "chat1").await.unwrap().unwrap().is_admin);
    }
}
