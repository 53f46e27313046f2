use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed user input. Reported immediately, nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required.")]
    MissingField(&'static str),
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("Passwords do not match!")]
    PasswordMismatch,
    #[error("Upgrade cost must be positive.")]
    NonPositiveCost,
    #[error("Quoted cost {quoted} does not match the catalog price {price}.")]
    PriceMismatch { quoted: Decimal, price: Decimal },
}

/// Failures reported by the authentication service. Displayed through
/// the code -> message table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{}", self.message())]
    EmailInUse,
    #[error("{}", self.message())]
    WeakPassword,
    #[error("{}", self.message())]
    InvalidEmail,
    #[error("{}", self.message())]
    NotFound,
    #[error("{}", self.message())]
    WrongPassword,
    #[error("{}", self.message())]
    TooManyRequests,
    /// A code the message table does not know about
    #[error("{}", self.message())]
    Other(String),
}

// code -> user-facing message
const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("auth/email-already-in-use", "This email is already registered."),
    ("auth/weak-password", "Password should be at least 6 characters."),
    ("auth/invalid-email", "Invalid email address."),
    ("auth/user-not-found", "No account found with this email."),
    ("auth/wrong-password", "Incorrect password."),
    (
        "auth/too-many-requests",
        "Too many failed attempts. Please try again later.",
    ),
];

const GENERIC_AUTH_MESSAGE: &str = "Authentication failed. Please try again.";

impl AuthError {
    pub fn code(&self) -> &str {
        match self {
            AuthError::EmailInUse => "auth/email-already-in-use",
            AuthError::WeakPassword => "auth/weak-password",
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::NotFound => "auth/user-not-found",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::TooManyRequests => "auth/too-many-requests",
            AuthError::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/email-already-in-use" => AuthError::EmailInUse,
            "auth/weak-password" => AuthError::WeakPassword,
            "auth/invalid-email" => AuthError::InvalidEmail,
            "auth/user-not-found" => AuthError::NotFound,
            "auth/wrong-password" => AuthError::WrongPassword,
            "auth/too-many-requests" => AuthError::TooManyRequests,
            other => AuthError::Other(other.to_string()),
        }
    }

    /// User-facing message for this error's code.
    pub fn message(&self) -> &'static str {
        let code = self.code();
        AUTH_MESSAGES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, message)| *message)
            .unwrap_or(GENERIC_AUTH_MESSAGE)
    }
}

/// Failures from the external document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
    #[error("Document {collection}/{id} does not exist")]
    NotFound { collection: String, id: String },
    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Malformed(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Insufficient balance: {balance} available, {cost} required.")]
    InsufficientBalance { balance: Decimal, cost: Decimal },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failures of the registration and login pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Failures of the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}
