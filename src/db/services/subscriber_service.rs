//! Registry operations on subscriber rows.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::db::entities::subscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

pub async fn list_subscribers(db: &DatabaseConnection) -> Result<Vec<subscriber::Model>, DbErr> {
    subscriber::Entity::find()
        .order_by_asc(subscriber::Column::Id)
        .all(db)
        .await
}

pub async fn get_subscriber(
    db: &DatabaseConnection,
    chat_ref: &str,
) -> Result<Option<subscriber::Model>, DbErr> {
    subscriber::Entity::find()
        .filter(subscriber::Column::ChatRef.eq(chat_ref))
        .one(db)
        .await
}

/// Inserts a subscriber row unless one already exists for `chat_ref`.
pub async fn subscribe(db: &DatabaseConnection, chat_ref: &str) -> Result<SubscribeOutcome, DbErr> {
    if get_subscriber(db, chat_ref).await?.is_some() {
        return Ok(SubscribeOutcome::AlreadySubscribed);
    }

    let new_subscriber = subscriber::ActiveModel {
        chat_ref: Set(chat_ref.to_owned()),
        token: Set(None),
        is_admin: Set(false),
        ..Default::default()
    };

    match new_subscriber.insert(db).await {
        Ok(_) => Ok(SubscribeOutcome::Subscribed),
        // Lost a race with a concurrent subscribe for the same chat.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Ok(SubscribeOutcome::AlreadySubscribed)
        }
        Err(e) => Err(e),
    }
}

/// Stores `token` as the only outstanding token for `chat_ref`, creating the
/// subscriber row if needed.
pub async fn store_token(
    db: &DatabaseConnection,
    chat_ref: &str,
    token: &str,
) -> Result<subscriber::Model, DbErr> {
    let txn = db.begin().await?;

    let existing = subscriber::Entity::find()
        .filter(subscriber::Column::ChatRef.eq(chat_ref))
        .one(&txn)
        .await?;

    let saved = match existing {
        Some(model) => {
            let mut active = model.into_active_model();
            active.token = Set(Some(token.to_owned()));
            active.update(&txn).await?
        }
        None => {
            subscriber::ActiveModel {
                chat_ref: Set(chat_ref.to_owned()),
                token: Set(Some(token.to_owned())),
                is_admin: Set(false),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    Ok(saved)
}

/// Sets `is_admin` for `chat_ref` when `token` equals the token stored on that
/// same row. Returns whether the flag was granted.
pub async fn grant_admin_if_token_matches(
    db: &DatabaseConnection,
    chat_ref: &str,
    token: &str,
) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let existing = subscriber::Entity::find()
        .filter(subscriber::Column::ChatRef.eq(chat_ref))
        .one(&txn)
        .await?;

    let Some(model) = existing else {
        txn.commit().await?;
        return Ok(false);
    };
    if model.token.as_deref() != Some(token) {
        txn.commit().await?;
        return Ok(false);
    }

    let mut active = model.into_active_model();
    active.is_admin = Set(true);
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_subscribe_twice_keeps_one_row() {
        let (db, _dir) = test_db().await;

        assert_eq!(subscribe(&db, "chat1").await.unwrap(), SubscribeOutcome::Subscribed);
        assert_eq!(
            subscribe(&db, "chat1").await.unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );

        let rows = list_subscribers(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chat_ref, "chat1");
        assert!(!rows[0].is_admin);
    }

    #[tokio::test]
    async fn test_store_token_overwrites_previous() {
        let (db, _dir) = test_db().await;

        store_token(&db, "chat1", "first").await.unwrap();
        let saved = store_token(&db, "chat1", "second").await.unwrap();

        assert_eq!(saved.token.as_deref(), Some("second"));
        assert_eq!(list_subscribers(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_token_on_existing_subscriber_keeps_row() {
        let (db, _dir) = test_db().await;
        subscribe(&db, "chat1").await.unwrap();

        store_token(&db, "chat1", "tok").await.unwrap();

        let rows = list_subscribers(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_grant_admin_requires_matching_row() {
        let (db, _dir) = test_db().await;
        store_token(&db, "chat1", "tok1").await.unwrap();

        assert!(!grant_admin_if_token_matches(&db, "unknown", "tok1").await.unwrap());
        assert!(!grant_admin_if_token_matches(&db, "chat1", "wrong").await.unwrap());
        assert!(grant_admin_if_token_matches(&db, "chat1", "tok1").await.unwrap());

        let row = get_subscriber(&db, "chat1").await.unwrap().unwrap();
        assert!(row.is_admin);
    }
}
