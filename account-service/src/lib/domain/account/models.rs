use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::account::errors::AccountIdError;
use crate::account::errors::EmailError;
use crate::account::errors::PasswordPolicyError;
use crate::account::errors::RoleError;

/// Account aggregate entity.
///
/// Carries the credential, lockout, trial, and single-use token state for
/// one registered account. The password itself is never stored, only the
/// Argon2id hash.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: EmailAddress,
    pub secret_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub login_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login_attempt: Option<DateTime<Utc>>,
    pub last_login_success: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub trial_start_date: DateTime<Utc>,
    pub is_subscribed: bool,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub verify_token_hash: Option<String>,
    pub verify_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account in its initial state.
    ///
    /// The account starts active, unverified, unsubscribed, with a clean
    /// lockout record and a trial starting at `now`.
    pub fn new(name: String, email: EmailAddress, secret_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            name,
            email,
            secret_hash,
            role: Role::Standard,
            is_active: true,
            email_verified: false,
            login_attempts: 0,
            lock_until: None,
            last_login_attempt: None,
            last_login_success: None,
            last_login_ip: None,
            trial_start_date: now,
            is_subscribed: false,
            subscription_start_date: None,
            subscription_end_date: None,
            reset_token_hash: None,
            reset_token_expiry: None,
            verify_token_hash: None,
            verify_token_expiry: None,
            created_at: now,
        }
    }
}

/// Account unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a new random account ID.
    ///
    /// # Returns
    /// AccountId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an account ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed AccountId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, AccountIdError> {
        Uuid::parse_str(s)
            .map(AccountId)
            .map_err(|e| AccountIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates format using an RFC 5322 compliant parser and stores the
/// address lowercased, so lookups are case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object, lowercased
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let email = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    ///
    /// # Returns
    /// Email string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Standard,
    Admin,
}

impl Role {
    /// Role as its stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Role::Standard),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

/// Password value type
///
/// Enforces the password strength policy at construction: length bounds,
/// a deny-list of very common passwords, and character class requirements.
/// The deny-list runs before the character checks so a well-known password
/// is reported as common, not merely as missing an uppercase letter.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 128;

    /// Compared case-insensitively against the candidate.
    const COMMON_PASSWORDS: [&'static str; 12] = [
        "password",
        "12345678",
        "123456789",
        "1234567890",
        "qwertyuiop",
        "password1",
        "password123",
        "iloveyou",
        "sunshine",
        "welcome1",
        "admin123",
        "letmein1",
    ];

    /// Create a new password that satisfies the strength policy.
    ///
    /// # Arguments
    /// * `password` - Raw password string
    ///
    /// # Returns
    /// Validated Password value object
    ///
    /// # Errors
    /// * `TooShort` - Fewer than 8 characters
    /// * `TooLong` - More than 128 characters
    /// * `TooCommon` - Matches the common-password deny list
    /// * `MissingUppercase` / `MissingLowercase` / `MissingDigit` - Required
    ///   character class absent
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let password = Self::with_valid_length(password)?;
        let password = Self::not_common(password)?;
        let password = Self::with_required_classes(password)?;
        Ok(Self(password))
    }

    fn with_valid_length(password: String) -> Result<String, PasswordPolicyError> {
        let length = password.chars().count();
        if length < Self::MIN_LENGTH {
            Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(password)
        }
    }

    fn not_common(password: String) -> Result<String, PasswordPolicyError> {
        let lowered = password.to_lowercase();
        if Self::COMMON_PASSWORDS.contains(&lowered.as_str()) {
            Err(PasswordPolicyError::TooCommon)
        } else {
            Ok(password)
        }
    }

    fn with_required_classes(password: String) -> Result<String, PasswordPolicyError> {
        if !password.chars().any(|c| c.is_uppercase()) {
            Err(PasswordPolicyError::MissingUppercase)
        } else if !password.chars().any(|c| c.is_lowercase()) {
            Err(PasswordPolicyError::MissingLowercase)
        } else if !password.chars().any(|c| c.is_ascii_digit()) {
            Err(PasswordPolicyError::MissingDigit)
        } else {
            Ok(password)
        }
    }

    /// Get password as string slice.
    ///
    /// # Returns
    /// Password string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Command to register a new account with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub name: String,
    pub email: EmailAddress,
    pub password: Password,
}

impl RegisterCommand {
    /// Construct a new register command.
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `email` - Validated email address
    /// * `password` - Policy-checked password (will be hashed by service)
    pub fn new(name: String, email: EmailAddress, password: Password) -> Self {
        Self {
            name,
            email,
            password,
        }
    }
}

/// Command to change an account's password.
///
/// The current password is kept as a raw string: it only has to match the
/// stored hash, not today's strength policy.
#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub current_password: String,
    pub new_password: Password,
}

impl ChangePasswordCommand {
    pub fn new(current_password: String, new_password: Password) -> Self {
        Self {
            current_password,
            new_password,
        }
    }
}

/// An account together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub token: String,
}
