use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::errors::AccountError;
use crate::account::lockout::AttemptOutcome;
use crate::account::lockout::LockoutPolicy;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::EmailAddress;
use crate::account::ports::AccountRepository;

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape of the `accounts` table.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    secret_hash: String,
    role: String,
    is_active: bool,
    email_verified: bool,
    login_attempts: i32,
    lock_until: Option<DateTime<Utc>>,
    last_login_attempt: Option<DateTime<Utc>>,
    last_login_success: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
    trial_start_date: DateTime<Utc>,
    is_subscribed: bool,
    subscription_start_date: Option<DateTime<Utc>>,
    subscription_end_date: Option<DateTime<Utc>>,
    reset_token_hash: Option<String>,
    reset_token_expiry: Option<DateTime<Utc>>,
    verify_token_hash: Option<String>,
    verify_token_expiry: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId(row.id),
            name: row.name,
            email: EmailAddress::new(row.email)?,
            secret_hash: row.secret_hash,
            role: row.role.parse()?,
            is_active: row.is_active,
            email_verified: row.email_verified,
            login_attempts: row.login_attempts.max(0) as u32,
            lock_until: row.lock_until,
            last_login_attempt: row.last_login_attempt,
            last_login_success: row.last_login_success,
            last_login_ip: row.last_login_ip,
            trial_start_date: row.trial_start_date,
            is_subscribed: row.is_subscribed,
            subscription_start_date: row.subscription_start_date,
            subscription_end_date: row.subscription_end_date,
            reset_token_hash: row.reset_token_hash,
            reset_token_expiry: row.reset_token_expiry,
            verify_token_hash: row.verify_token_hash,
            verify_token_expiry: row.verify_token_expiry,
            created_at: row.created_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> AccountError {
    AccountError::Database(e.to_string())
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, name, email, secret_hash, role, is_active, email_verified,
                login_attempts, lock_until, last_login_attempt, last_login_success,
                last_login_ip, trial_start_date, is_subscribed,
                subscription_start_date, subscription_end_date,
                reset_token_hash, reset_token_expiry,
                verify_token_hash, verify_token_expiry, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(account.id.0)
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.secret_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.email_verified)
        .bind(account.login_attempts as i32)
        .bind(account.lock_until)
        .bind(account.last_login_attempt)
        .bind(account.last_login_success)
        .bind(account.last_login_ip.as_deref())
        .bind(account.trial_start_date)
        .bind(account.is_subscribed)
        .bind(account.subscription_start_date)
        .bind(account.subscription_end_date)
        .bind(account.reset_token_hash.as_deref())
        .bind(account.reset_token_expiry)
        .bind(account.verify_token_hash.as_deref())
        .bind(account.verify_token_expiry)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("accounts_email_key")
                {
                    return AccountError::EmailAlreadyExists;
                }
            }
            AccountError::Database(e.to_string())
        })?;

        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn touch_login_attempt(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET last_login_attempt = $2, last_login_ip = COALESCE($3, last_login_ip)
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(now)
        .bind(client_ip.as_deref())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
        policy: &LockoutPolicy,
    ) -> Result<AttemptOutcome, AccountError> {
        // Single statement so concurrent failures cannot interleave on the
        // counters. The CASE branches mirror LockoutPolicy::on_failure: an
        // expired lock restarts the window at one attempt.
        let row = sqlx::query_as::<_, (i32, Option<DateTime<Utc>>)>(
            r#"
            UPDATE accounts
            SET last_login_attempt = $2,
                last_login_ip = COALESCE($3, last_login_ip),
                login_attempts = CASE
                    WHEN lock_until IS NOT NULL AND lock_until <= $2 THEN 1
                    ELSE login_attempts + 1
                END,
                lock_until = CASE
                    WHEN lock_until IS NOT NULL AND lock_until <= $2 THEN NULL
                    WHEN login_attempts + 1 >= $4 THEN $5
                    ELSE lock_until
                END
            WHERE id = $1
            RETURNING login_attempts, lock_until
            "#,
        )
        .bind(id.0)
        .bind(now)
        .bind(client_ip.as_deref())
        .bind(policy.max_attempts as i32)
        .bind(now + policy.lockout_duration)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        let (login_attempts, lock_until) = row.ok_or(AccountError::NotFound)?;
        Ok(AttemptOutcome {
            login_attempts: login_attempts.max(0) as u32,
            lock_until,
        })
    }

    async fn record_login_success(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET login_attempts = 0,
                lock_until = NULL,
                last_login_attempt = $2,
                last_login_success = $2,
                last_login_ip = COALESCE($3, last_login_ip)
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(now)
        .bind(client_ip.as_deref())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn update_secret_hash(
        &self,
        id: &AccountId,
        secret_hash: &str,
    ) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE accounts SET secret_hash = $2 WHERE id = $1")
            .bind(id.0)
            .bind(secret_hash)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let result = sqlx::query(
            "UPDATE accounts SET reset_token_hash = $2, reset_token_expiry = $3 WHERE id = $1",
        )
        .bind(id.0)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError> {
        // Clearing the token in the matching statement is what makes it
        // single use under concurrent redemption.
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET reset_token_hash = NULL, reset_token_expiry = NULL
            WHERE reset_token_hash = $1 AND reset_token_expiry > $2
            RETURNING *
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn reset_secret(&self, id: &AccountId, secret_hash: &str) -> Result<(), AccountError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET secret_hash = $2, login_attempts = 0, lock_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(secret_hash)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn consume_verify_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            UPDATE accounts
            SET email_verified = TRUE, verify_token_hash = NULL, verify_token_expiry = NULL
            WHERE verify_token_hash = $1 AND verify_token_expiry > $2
            RETURNING *
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn set_subscription(
        &self,
        id: &AccountId,
        subscribed: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), AccountError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_subscribed = $2, subscription_start_date = $3, subscription_end_date = $4
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(subscribed)
        .bind(start)
        .bind(end)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: &AccountId, active: bool) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE accounts SET is_active = $2 WHERE id = $1")
            .bind(id.0)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }
}
