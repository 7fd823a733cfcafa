mod error;
mod model;

pub use error::AccountError;
pub use model::{premium_now, UserAccount};

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use libsql::{params, Connection, Row, Value};
use teloxide::types::UserId;

use crate::storage::StorageManager;

const USER_COLUMNS: &str =
    "id, username, is_premium, credits, validity_expire_at, selected_model, tts_speed, created_at, updated_at";

/// Durable account ledger: credit balance, validity window and the admin set.
/// Rows are created idempotently on first interaction and never deleted here.
#[derive(Clone)]
pub struct AccountService {
    storage: StorageManager,
    bootstrap_admin: Option<UserId>,
}

impl AccountService {
    pub fn new(storage: StorageManager, bootstrap_admin: Option<UserId>) -> Self {
        Self {
            storage,
            bootstrap_admin,
        }
    }

    fn connection(&self) -> Connection {
        self.storage.turso().get_connection()
    }

    pub async fn ensure_user(&self, user_id: UserId, username: Option<&str>) -> Result<(), AccountError> {
        let conn = self.connection();
        let now = timestamp(Utc::now());

        conn.execute(
            "INSERT OR IGNORE INTO users (id, username, is_premium, credits, tts_speed, created_at, updated_at) \
             VALUES (?1, ?2, 0, 0, 'natural', ?3, ?3)",
            params![user_id.0 as i64, opt_text(username), now],
        )
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>, AccountError> {
        let conn = self.connection();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id.0 as i64],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_user_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn require_user(&self, user_id: UserId) -> Result<UserAccount, AccountError> {
        self.get_user(user_id).await?.ok_or(AccountError::UserNotFound(user_id))
    }

    /// Adds credits. The row is created first if the user never interacted,
    /// so admins can preload accounts.
    pub async fn grant_credits(&self, user_id: UserId, amount: i64) -> Result<UserAccount, AccountError> {
        self.ensure_user(user_id, None).await?;
        let user = self.require_user(user_id).await?;

        let credits = user.credits.saturating_add(amount).max(0);
        self.write_ledger(user_id, credits, user.validity_expire_at).await
    }

    /// Removes credits, clamping the balance at zero.
    pub async fn consume_credits(&self, user_id: UserId, amount: i64) -> Result<UserAccount, AccountError> {
        let user = self.require_user(user_id).await?;

        let credits = user.credits.saturating_sub(amount).max(0);
        self.write_ledger(user_id, credits, user.validity_expire_at).await
    }

    pub async fn grant_validity(&self, user_id: UserId, days: i64) -> Result<UserAccount, AccountError> {
        let window = Duration::try_days(days).ok_or(AccountError::ValidityOutOfRange(days))?;
        let expires = Utc::now()
            .checked_add_signed(window)
            .ok_or(AccountError::ValidityOutOfRange(days))?;

        self.ensure_user(user_id, None).await?;
        let user = self.require_user(user_id).await?;

        self.write_ledger(user_id, user.credits, Some(expires)).await
    }

    pub async fn revoke_validity(&self, user_id: UserId) -> Result<UserAccount, AccountError> {
        let user = self.require_user(user_id).await?;

        self.write_ledger(user_id, user.credits, None).await
    }

    pub async fn is_currently_valid(&self, user_id: UserId) -> Result<bool, AccountError> {
        let now = Utc::now();
        Ok(self
            .get_user(user_id)
            .await?
            .and_then(|user| user.validity_expire_at)
            .is_some_and(|expires| expires > now))
    }

    /// Single write path for ledger mutations: stores the new balance and
    /// validity window, re-derives the premium flag and stamps `updated_at`.
    async fn write_ledger(
        &self,
        user_id: UserId,
        credits: i64,
        validity_expire_at: Option<DateTime<Utc>>,
    ) -> Result<UserAccount, AccountError> {
        let conn = self.connection();
        let now = Utc::now();
        let is_premium = premium_now(credits, validity_expire_at, now);

        conn.execute(
            "UPDATE users SET credits = ?1, validity_expire_at = ?2, is_premium = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                credits,
                opt_timestamp(validity_expire_at),
                is_premium as i64,
                timestamp(now),
                user_id.0 as i64
            ],
        )
        .await?;

        self.require_user(user_id).await
    }

    pub async fn list_users(&self, limit: u32) -> Result<Vec<UserAccount>, AccountError> {
        let conn = self.connection();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(parse_user_row(&row)?);
        }
        Ok(users)
    }

    pub async fn list_premium_users(&self, limit: u32) -> Result<Vec<UserAccount>, AccountError> {
        let conn = self.connection();
        let mut rows = conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE is_premium = 1 ORDER BY updated_at DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(parse_user_row(&row)?);
        }
        Ok(users)
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool, AccountError> {
        if self.bootstrap_admin == Some(user_id) {
            return Ok(true);
        }

        let conn = self.connection();
        let mut rows = conn
            .query("SELECT user_id FROM admins WHERE user_id = ?1", params![user_id.0 as i64])
            .await?;

        Ok(rows.next().await?.is_some())
    }

    pub async fn add_admin(&self, user_id: UserId) -> Result<(), AccountError> {
        let conn = self.connection();
        conn.execute(
            "INSERT OR IGNORE INTO admins (user_id) VALUES (?1)",
            params![user_id.0 as i64],
        )
        .await?;

        Ok(())
    }

    pub async fn remove_admin(&self, user_id: UserId) -> Result<(), AccountError> {
        let conn = self.connection();
        conn.execute("DELETE FROM admins WHERE user_id = ?1", params![user_id.0 as i64])
            .await?;

        Ok(())
    }

    /// All admins: the configured bootstrap admin (if any) plus the stored
    /// set, deduplicated.
    pub async fn list_admins(&self) -> Result<Vec<UserId>, AccountError> {
        let conn = self.connection();
        let mut rows = conn.query("SELECT user_id FROM admins ORDER BY user_id", ()).await?;

        let mut admins = Vec::new();
        if let Some(bootstrap) = self.bootstrap_admin {
            admins.push(bootstrap);
        }

        while let Some(row) = rows.next().await? {
            match row.get_value(0)? {
                Value::Integer(id) => {
                    let id = UserId(id as u64);
                    if !admins.contains(&id) {
                        admins.push(id);
                    }
                }
                other => {
                    return Err(AccountError::MalformedRow(format!(
                        "admins.user_id: expected integer, got {other:?}"
                    )))
                }
            }
        }

        Ok(admins)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn opt_timestamp(at: Option<DateTime<Utc>>) -> Value {
    match at {
        Some(at) => Value::Text(timestamp(at)),
        None => Value::Null,
    }
}

fn opt_text(text: Option<&str>) -> Value {
    match text {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

fn parse_user_row(row: &Row) -> Result<UserAccount, AccountError> {
    Ok(UserAccount {
        id: UserId(integer_at(row, 0)? as u64),
        username: text_at(row, 1)?,
        is_premium: integer_at(row, 2)? != 0,
        credits: integer_at(row, 3)?,
        validity_expire_at: parse_opt_time(text_at(row, 4)?)?,
        selected_model: text_at(row, 5)?,
        tts_speed: text_at(row, 6)?,
        created_at: parse_opt_time(text_at(row, 7)?)?
            .ok_or_else(|| AccountError::MalformedRow("created_at is null".to_string()))?,
        updated_at: parse_opt_time(text_at(row, 8)?)?
            .ok_or_else(|| AccountError::MalformedRow("updated_at is null".to_string()))?,
    })
}

fn integer_at(row: &Row, index: i32) -> Result<i64, AccountError> {
    match row.get_value(index)? {
        Value::Integer(value) => Ok(value),
        Value::Null => Ok(0),
        other => Err(AccountError::MalformedRow(format!(
            "column {index}: expected integer, got {other:?}"
        ))),
    }
}

fn text_at(row: &Row, index: i32) -> Result<Option<String>, AccountError> {
    match row.get_value(index)? {
        Value::Text(value) => Ok(Some(value)),
        Value::Null => Ok(None),
        other => Err(AccountError::MalformedRow(format!(
            "column {index}: expected text, got {other:?}"
        ))),
    }
}

fn parse_opt_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, AccountError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    // Rows written by older deployments carry offset-less UTC timestamps.
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|at| Some(at.and_utc()))
        .map_err(|e| AccountError::MalformedRow(format!("bad timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use chrono::TimeZone;

    const ALICE: UserId = UserId(1001);
    const BOB: UserId = UserId(1002);
    const BOOTSTRAP: UserId = UserId(42);

    async fn test_service() -> AccountService {
        let config = StorageConfig {
            database_path: ":memory:".to_string(),
            turso_url: None,
            turso_token: None,
        };
        let storage = StorageManager::init(&config).await.unwrap();
        AccountService::new(storage, Some(BOOTSTRAP))
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let service = test_service().await;

        service.ensure_user(ALICE, Some("alice")).await.unwrap();
        service.ensure_user(ALICE, Some("renamed")).await.unwrap();

        let user = service.get_user(ALICE).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.credits, 0);
        assert!(!user.is_premium);
        assert_eq!(user.tts_speed.as_deref(), Some("natural"));
    }

    #[tokio::test]
    async fn granting_credits_registers_and_marks_premium() {
        let service = test_service().await;

        let user = service.grant_credits(ALICE, 5).await.unwrap();

        assert_eq!(user.credits, 5);
        assert!(user.is_premium);
        assert!(user.is_premium_now(Utc::now()));
    }

    #[tokio::test]
    async fn consuming_credits_clamps_at_zero() {
        let service = test_service().await;
        service.grant_credits(ALICE, 2).await.unwrap();

        let user = service.consume_credits(ALICE, 5).await.unwrap();

        assert_eq!(user.credits, 0);
        assert!(!user.is_premium);
    }

    #[tokio::test]
    async fn consuming_credits_for_unknown_user_fails() {
        let service = test_service().await;

        let result = service.consume_credits(ALICE, 1).await;
        assert!(matches!(result, Err(AccountError::UserNotFound(id)) if id == ALICE));
    }

    #[tokio::test]
    async fn reads_rows_with_legacy_naive_timestamps() {
        let service = test_service().await;

        let conn = service.connection();
        conn.execute(
            "INSERT INTO users (id, username, credits, validity_expire_at, created_at, updated_at) \
             VALUES (?1, 'legacy', 2, '2099-01-01T00:00:00', '2024-01-01T12:00:00.123456', '2024-01-01T12:00:00.123456')",
            params![ALICE.0 as i64],
        )
        .await
        .unwrap();

        let user = service.get_user(ALICE).await.unwrap().unwrap();
        assert_eq!(user.credits, 2);
        assert_eq!(
            user.validity_expire_at,
            Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(service.is_currently_valid(ALICE).await.unwrap());

        // mutations work on legacy rows too
        let user = service.grant_credits(ALICE, 1).await.unwrap();
        assert_eq!(user.credits, 3);
    }

    #[tokio::test]
    async fn absurd_validity_lengths_are_rejected() {
        let service = test_service().await;

        let result = service.grant_validity(ALICE, i64::MAX).await;

        assert!(matches!(result, Err(AccountError::ValidityOutOfRange(_))));
        assert!(service.get_user(ALICE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validity_window_grants_and_revokes() {
        let service = test_service().await;

        let user = service.grant_validity(ALICE, 30).await.unwrap();
        assert!(user.is_premium);
        assert!(service.is_currently_valid(ALICE).await.unwrap());

        let user = service.revoke_validity(ALICE).await.unwrap();
        assert!(!user.is_premium);
        assert!(user.validity_expire_at.is_none());
        assert!(!service.is_currently_valid(ALICE).await.unwrap());
    }

    #[tokio::test]
    async fn credits_keep_premium_when_validity_is_revoked() {
        let service = test_service().await;
        service.grant_credits(ALICE, 3).await.unwrap();
        service.grant_validity(ALICE, 7).await.unwrap();

        let user = service.revoke_validity(ALICE).await.unwrap();

        assert_eq!(user.credits, 3);
        assert!(user.is_premium);
        assert!(user.is_premium_now(Utc::now()));
    }

    #[tokio::test]
    async fn premium_listing_contains_only_premium_accounts() {
        let service = test_service().await;
        service.grant_credits(ALICE, 1).await.unwrap();
        service.ensure_user(BOB, Some("bob")).await.unwrap();

        let premium = service.list_premium_users(100).await.unwrap();

        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].id, ALICE);

        let all = service.list_users(100).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn admin_set_is_idempotent() {
        let service = test_service().await;

        assert!(service.is_admin(BOOTSTRAP).await.unwrap());
        assert!(!service.is_admin(ALICE).await.unwrap());

        service.add_admin(ALICE).await.unwrap();
        service.add_admin(ALICE).await.unwrap();
        assert!(service.is_admin(ALICE).await.unwrap());

        let admins = service.list_admins().await.unwrap();
        assert_eq!(admins, vec![BOOTSTRAP, ALICE]);

        service.remove_admin(ALICE).await.unwrap();
        service.remove_admin(ALICE).await.unwrap();
        assert!(!service.is_admin(ALICE).await.unwrap());
    }
}
