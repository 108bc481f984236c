use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::errors::MailerError;
use crate::account::lockout::AttemptOutcome;
use crate::account::lockout::LockoutPolicy;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::AuthenticatedAccount;
use crate::account::models::ChangePasswordCommand;
use crate::account::models::Password;
use crate::account::models::RegisterCommand;

/// Port for account persistence operations.
///
/// The attempt-recording methods apply their counter transitions in a
/// single atomic step, concurrent logins against one account must not
/// interleave read-modify-write on the lockout columns.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persist a new account.
    ///
    /// # Arguments
    /// * `account` - Account in its initial state
    ///
    /// # Returns
    /// The stored account
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Database` - Persistence failure
    async fn create(&self, account: Account) -> Result<Account, AccountError>;

    /// Find an account by its ID.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError>;

    /// Find an account by email. Callers pass the lowercased form.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    /// Record that a login attempt happened without touching the counters.
    ///
    /// Used for attempts rejected before password verification, a locked
    /// or deactivated account still gets its audit fields updated.
    ///
    /// # Arguments
    /// * `id` - Account the attempt targeted
    /// * `now` - Attempt timestamp
    /// * `client_ip` - Source address if known
    async fn touch_login_attempt(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError>;

    /// Record a failed password check and advance the lockout counters.
    ///
    /// Applies [`LockoutPolicy::on_failure`] to the stored state and the
    /// audit fields in one atomic update.
    ///
    /// # Returns
    /// The counter state after the transition, so the caller can tell
    /// whether this failure placed a lock
    ///
    /// # Errors
    /// * `NotFound` - No account with this ID
    /// * `Database` - Persistence failure
    async fn record_failed_attempt(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
        policy: &LockoutPolicy,
    ) -> Result<AttemptOutcome, AccountError>;

    /// Record a successful login: clear the counters, stamp the audit fields.
    async fn record_login_success(
        &self,
        id: &AccountId,
        now: DateTime<Utc>,
        client_ip: Option<String>,
    ) -> Result<(), AccountError>;

    /// Replace the stored password hash.
    async fn update_secret_hash(
        &self,
        id: &AccountId,
        secret_hash: &str,
    ) -> Result<(), AccountError>;

    /// Store a password reset token digest with its expiry.
    ///
    /// Overwrites any previous token, only the most recent reset link is
    /// usable.
    async fn set_reset_token(
        &self,
        id: &AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AccountError>;

    /// Redeem a password reset token.
    ///
    /// Clears the token in the same step that matches it, a second call
    /// with the same digest returns `None`. Expired tokens never match.
    ///
    /// # Arguments
    /// * `token_hash` - Digest of the presented token
    /// * `now` - Redemption timestamp
    ///
    /// # Returns
    /// The owning account, or `None` when the digest is unknown, already
    /// used, or expired
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError>;

    /// Install a password chosen through the reset flow.
    ///
    /// Also clears the lockout counters, a locked-out holder who proves
    /// mailbox ownership gets back in immediately.
    async fn reset_secret(&self, id: &AccountId, secret_hash: &str) -> Result<(), AccountError>;

    /// Redeem an email verification token, marking the address verified.
    ///
    /// Same single-use contract as [`consume_reset_token`](Self::consume_reset_token).
    async fn consume_verify_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, AccountError>;

    /// Update the subscription flags, driven by billing, not by HTTP.
    async fn set_subscription(
        &self,
        id: &AccountId,
        subscribed: bool,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), AccountError>;

    /// Activate or deactivate an account.
    async fn set_active(&self, id: &AccountId, active: bool) -> Result<(), AccountError>;
}

/// Port for outbound account mail.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Send the email verification message carrying the raw token.
    async fn send_email_verification(&self, email: &str, token: &str) -> Result<(), MailerError>;

    /// Send the password reset message carrying the raw token.
    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), MailerError>;
}

/// Port for account service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new account and open a session for it.
    ///
    /// # Arguments
    /// * `command` - Validated registration data
    ///
    /// # Returns
    /// The stored account with a fresh session token
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    async fn register(&self, command: RegisterCommand)
        -> Result<AuthenticatedAccount, AccountError>;

    /// Authenticate with email and password.
    ///
    /// # Arguments
    /// * `email` - Submitted email, any casing
    /// * `password` - Submitted password
    /// * `client_ip` - Source address for the audit trail
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password, the two
    ///   are indistinguishable from the outside
    /// * `AccountDeactivated` - Account exists but was deactivated
    /// * `AccountLocked` - Too many recent failures, includes the minutes
    ///   until the lock expires
    async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<String>,
    ) -> Result<AuthenticatedAccount, AccountError>;

    /// Fetch an account by ID.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, AccountError>;

    /// Change the password of an authenticated account.
    ///
    /// # Errors
    /// * `WrongCurrentPassword` - Current password did not match
    /// * `SamePassword` - New password equals the current one
    async fn change_password(
        &self,
        id: &AccountId,
        command: ChangePasswordCommand,
    ) -> Result<AuthenticatedAccount, AccountError>;

    /// Start the password reset flow for an email address.
    ///
    /// Succeeds whether or not the email is registered, the response must
    /// not reveal which.
    async fn request_password_reset(&self, email: &str) -> Result<(), AccountError>;

    /// Complete the password reset flow with a mailed token.
    ///
    /// # Errors
    /// * `InvalidResetToken` - Token unknown, already used, or expired
    async fn reset_password(
        &self,
        token: &str,
        new_password: Password,
    ) -> Result<AuthenticatedAccount, AccountError>;

    /// Confirm an email address with a mailed token.
    ///
    /// # Errors
    /// * `InvalidVerifyToken` - Token unknown, already used, or expired
    async fn verify_email(&self, token: &str) -> Result<Account, AccountError>;
}
