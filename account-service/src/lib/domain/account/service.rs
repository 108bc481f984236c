use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenIssuer;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::lockout;
use crate::account::lockout::LockState;
use crate::account::lockout::LockoutPolicy;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::AuthenticatedAccount;
use crate::account::models::ChangePasswordCommand;
use crate::account::models::Password;
use crate::account::models::RegisterCommand;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;
use crate::account::ports::Mailer;
use crate::account::tokens;

const RESET_TOKEN_TTL_MINUTES: i64 = 10;
const VERIFY_TOKEN_TTL_HOURS: i64 = 24;

/// Account service implementation.
///
/// Owns the credential, lockout, and session-issuing flows. Password
/// hashing and verification run on the blocking pool, Argon2id at
/// production cost takes tens of milliseconds and must not stall the
/// async executor.
#[derive(Clone)]
pub struct AccountService<R, M>
where
    R: AccountRepository,
    M: Mailer,
{
    repository: Arc<R>,
    mailer: Arc<M>,
    password_hasher: PasswordHasher,
    token_issuer: TokenIssuer,
    lockout: LockoutPolicy,
}

impl<R, M> AccountService<R, M>
where
    R: AccountRepository,
    M: Mailer,
{
    pub fn new(
        repository: Arc<R>,
        mailer: Arc<M>,
        password_hasher: PasswordHasher,
        token_issuer: TokenIssuer,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            repository,
            mailer,
            password_hasher,
            token_issuer,
            lockout,
        }
    }

    /// Lockout policy this service enforces.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        self.lockout
    }

    async fn hash_password(&self, password: &str) -> Result<String, AccountError> {
        let hasher = self.password_hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AccountError::Unknown(format!("Hashing task failed: {}", e)))?
            .map_err(AccountError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AccountError> {
        let hasher = self.password_hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AccountError::Unknown(format!("Verification task failed: {}", e)))?
            .map_err(AccountError::from)
    }

    /// Hash and discard, so the unknown-email path costs the same as a
    /// failed verification.
    async fn burn_hash(&self, password: &str) {
        let _ = self.hash_password(password).await;
    }

    fn issue_session(
        &self,
        account: Account,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedAccount, AccountError> {
        let issued = self.token_issuer.issue(
            &account.id.to_string(),
            account.email.as_str(),
            account.role.as_str(),
            now,
        )?;
        Ok(AuthenticatedAccount {
            account,
            token: issued.token,
        })
    }
}

#[async_trait]
impl<R, M> AccountServicePort for AccountService<R, M>
where
    R: AccountRepository,
    M: Mailer,
{
    async fn register(
        &self,
        command: RegisterCommand,
    ) -> Result<AuthenticatedAccount, AccountError> {
        let now = Utc::now();
        let secret_hash = self.hash_password(command.password.as_str()).await?;

        let verify_token = tokens::generate_token();
        let mut account = Account::new(command.name, command.email, secret_hash, now);
        account.verify_token_hash = Some(tokens::hash_token(&verify_token));
        account.verify_token_expiry = Some(now + Duration::hours(VERIFY_TOKEN_TTL_HOURS));

        let account = self.repository.create(account).await?;

        // Log the error but don't fail the registration
        if let Err(e) = self
            .mailer
            .send_email_verification(account.email.as_str(), &verify_token)
            .await
        {
            tracing::error!(
                error = %e,
                account_id = %account.id,
                "Failed to send verification email"
            );
        }

        tracing::info!(account_id = %account.id, "Account registered");
        self.issue_session(account, now)
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<String>,
    ) -> Result<AuthenticatedAccount, AccountError> {
        let now = Utc::now();
        let normalized = email.trim().to_lowercase();

        let Some(account) = self.repository.find_by_email(&normalized).await? else {
            // Burn a hash so an unknown email costs the same as a wrong
            // password.
            self.burn_hash(password).await;
            return Err(AccountError::InvalidCredentials);
        };

        if !account.is_active {
            self.repository
                .touch_login_attempt(&account.id, now, client_ip)
                .await?;
            return Err(AccountError::AccountDeactivated);
        }

        if let LockState::Locked { remaining } = self.lockout.check(account.lock_until, now) {
            self.repository
                .touch_login_attempt(&account.id, now, client_ip)
                .await?;
            tracing::warn!(account_id = %account.id, "Login attempt against locked account");
            return Err(AccountError::AccountLocked {
                minutes_remaining: lockout::minutes_remaining(remaining),
            });
        }

        if !self.verify_password(password, &account.secret_hash).await? {
            let outcome = self
                .repository
                .record_failed_attempt(&account.id, now, client_ip, &self.lockout)
                .await?;
            if outcome.locked() {
                tracing::warn!(
                    account_id = %account.id,
                    attempts = outcome.login_attempts,
                    "Account locked after repeated login failures"
                );
                return Err(AccountError::AccountLocked {
                    minutes_remaining: lockout::minutes_remaining(self.lockout.lockout_duration),
                });
            }
            return Err(AccountError::InvalidCredentials);
        }

        self.repository
            .record_login_success(&account.id, now, client_ip)
            .await?;
        tracing::info!(account_id = %account.id, "Login succeeded");
        self.issue_session(account, now)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        self.repository.find_by_id(id).await
    }

    async fn change_password(
        &self,
        id: &AccountId,
        command: ChangePasswordCommand,
    ) -> Result<AuthenticatedAccount, AccountError> {
        let now = Utc::now();
        let account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self
            .verify_password(&command.current_password, &account.secret_hash)
            .await?
        {
            return Err(AccountError::WrongCurrentPassword);
        }

        if command.new_password.as_str() == command.current_password {
            return Err(AccountError::SamePassword);
        }

        let secret_hash = self.hash_password(command.new_password.as_str()).await?;
        self.repository.update_secret_hash(id, &secret_hash).await?;

        tracing::info!(account_id = %account.id, "Password changed");
        let account = Account {
            secret_hash,
            ..account
        };
        self.issue_session(account, now)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError> {
        let now = Utc::now();
        let normalized = email.trim().to_lowercase();

        // The handler answers identically whether or not the email is
        // registered, so every early return here must be Ok.
        let Some(account) = self.repository.find_by_email(&normalized).await? else {
            return Ok(());
        };
        if !account.is_active {
            return Ok(());
        }

        let token = tokens::generate_token();
        self.repository
            .set_reset_token(
                &account.id,
                &tokens::hash_token(&token),
                now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            )
            .await?;

        if let Err(e) = self
            .mailer
            .send_password_reset(account.email.as_str(), &token)
            .await
        {
            tracing::error!(
                error = %e,
                account_id = %account.id,
                "Failed to send password reset email"
            );
        }

        tracing::info!(account_id = %account.id, "Password reset requested");
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: Password,
    ) -> Result<AuthenticatedAccount, AccountError> {
        let now = Utc::now();
        let account = self
            .repository
            .consume_reset_token(&tokens::hash_token(token), now)
            .await?
            .ok_or(AccountError::InvalidResetToken)?;

        if !account.is_active {
            return Err(AccountError::AccountDeactivated);
        }

        let secret_hash = self.hash_password(new_password.as_str()).await?;
        self.repository.reset_secret(&account.id, &secret_hash).await?;

        tracing::info!(account_id = %account.id, "Password reset completed");
        let account = Account {
            secret_hash,
            login_attempts: 0,
            lock_until: None,
            ..account
        };
        self.issue_session(account, now)
    }

    async fn verify_email(&self, token: &str) -> Result<Account, AccountError> {
        let now = Utc::now();
        let account = self
            .repository
            .consume_verify_token(&tokens::hash_token(token), now)
            .await?
            .ok_or(AccountError::InvalidVerifyToken)?;

        tracing::info!(account_id = %account.id, "Email address verified");
        Ok(account)
    }
}
