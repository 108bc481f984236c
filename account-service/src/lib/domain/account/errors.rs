use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccountIdError {
    #[error("Invalid account ID format: {0}")]
    InvalidFormat(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidFormat(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    Unknown(String),
}

/// Password strength policy violations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("Password must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("Password is too common, choose a less guessable one")]
    TooCommon,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one digit")]
    MissingDigit,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MailerError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Account operation errors.
///
/// The credential failures deliberately collapse into a single
/// `InvalidCredentials` variant so responses cannot distinguish an unknown
/// email from a wrong password.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AccountError {
    #[error(transparent)]
    InvalidAccountId(#[from] AccountIdError),
    #[error(transparent)]
    InvalidEmail(#[from] EmailError),
    #[error(transparent)]
    InvalidRole(#[from] RoleError),
    #[error(transparent)]
    WeakPassword(#[from] PasswordPolicyError),
    #[error(transparent)]
    Hashing(#[from] auth::PasswordError),
    #[error(transparent)]
    Token(#[from] auth::TokenError),
    #[error("Email is already registered")]
    EmailAlreadyExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongCurrentPassword,
    #[error("New password must be different from the current password")]
    SamePassword,
    #[error("Account has been deactivated")]
    AccountDeactivated,
    #[error("Account is temporarily locked. Try again in {minutes_remaining} minute(s)")]
    AccountLocked { minutes_remaining: i64 },
    #[error("Password reset token is invalid or has expired")]
    InvalidResetToken,
    #[error("Email verification token is invalid or has expired")]
    InvalidVerifyToken,
    #[error("Account not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Unknown error: {0}")]
    Unknown(String),
}
