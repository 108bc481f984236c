use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::lockout::AttemptOutcome;
use crate::account::lockout::LockoutPolicy;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::ports::AccountRepository;

/// Account store backed by a mutex-guarded map.
///
/// Backs the integration tests and local development without Postgres.
/// Every counter transition happens under the single lock, which gives it
/// the same atomicity the SQL adapter gets from single-statement updates.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop an account entirely. Test hook for stale-session scenarios.
    pub fn remove(&self, id: &AccountId) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.remove(id);
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<AccountId, Account>>, AccountError> {
        self.accounts
            .lock()
            .map_err(|_| AccountError::Unknown("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        let mut accounts = self.guard()?;
        if accounts
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Err(AccountError::EmailAlreadyExists);
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        Ok(self.guard()?.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        Ok(self
            .guard()?
            .values()
            .find(|account| account.email.as_str() == email)
            .cloned())
    }

    async fn touch_login_attempt(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.last_login_attempt = Some(now);
        if client_ip.is_some() {
            account.last_login_ip = client_ip;
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
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;

        let outcome = policy.on_failure(account.login_attempts, account.lock_until, now);
        account.login_attempts = outcome.login_attempts;
        account.lock_until = outcome.lock_until;
        account.last_login_attempt = Some(now);
        if client_ip.is_some() {
            account.last_login_ip = client_ip;
        }
        Ok(outcome)
    }

    async fn record_login_success(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;

        account.login_attempts = 0;
        account.lock_until = None;
        account.last_login_attempt = Some(now);
        account.last_login_success = Some(now);
        if client_ip.is_some() {
            account.last_login_ip = client_ip;
        }
        Ok(())
    }

    async fn update_secret_hash(
        &self,
        id: &AccountId,
        secret_hash: &str,
    ) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.secret_hash = secret_hash.to_string();
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.reset_token_hash = Some(token_hash.to_string());
        account.reset_token_expiry = Some(expires_at);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.guard()?;
        let matched = accounts.values_mut().find(|account| {
            account.reset_token_hash.as_deref() == Some(token_hash)
                && matches!(account.reset_token_expiry, Some(expiry) if expiry > now)
        });

        Ok(matched.map(|account| {
            account.reset_token_hash = None;
            account.reset_token_expiry = None;
            account.clone()
        }))
    }

    async fn reset_secret(&self, id: &AccountId, secret_hash: &str) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.secret_hash = secret_hash.to_string();
        account.login_attempts = 0;
        account.lock_until = None;
        Ok(())
    }

    async fn consume_verify_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.guard()?;
        let matched = accounts.values_mut().find(|account| {
            account.verify_token_hash.as_deref() == Some(token_hash)
                && matches!(account.verify_token_expiry, Some(expiry) if expiry > now)
        });

        Ok(matched.map(|account| {
            account.email_verified = true;
            account.verify_token_hash = None;
            account.verify_token_expiry = None;
            account.clone()
        }))
    }

    async fn set_subscription(
        &self,
        id: &AccountId,
        subscribed: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.is_subscribed = subscribed;
        account.subscription_start_date = start;
        account.subscription_end_date = end;
        Ok(())
    }

    async fn set_active(&self, id: &AccountId, active: bool) -> Result<(), AccountError> {
        let mut accounts = self.guard()?;
        let account = accounts.get_mut(id).ok_or(AccountError::NotFound)?;
        account.is_active = active;
        Ok(())
    }
}
