use std::convert::Infallible;

/// Field-level failures detected before anything is written.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A payment proof must be uploaded before submitting the order")]
    MissingPaymentProof,
    #[error("Order contains no items")]
    EmptyOrder,
    #[error("Required field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("Quantity for product {0} must be at least 1")]
    InvalidQuantity(String),
    #[error("Product {0} appears on more than one line")]
    DuplicateLine(String),
    #[error("Submitted total {submitted} does not match computed total {computed}")]
    TotalMismatch { submitted: u64, computed: u64 },
    #[error("Amount overflowed while computing the order total")]
    AmountOverflow,
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("`{0}` is not a valid identifier")]
    InvalidId(String),
    #[error("Product {0} is not in the catalog")]
    UnknownProduct(String),
    #[error("Upload body is empty")]
    EmptyUpload,
    #[error("Unknown order status: {0}")]
    InvalidStatus(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Not permitted: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage unavailable: {0}")]
    TransientIo(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] minicbor::encode::Error<Infallible>),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("Credential processing failed: {0}")]
    Credential(String),
}

impl StorefrontError {
    /// Whether the caller may repeat the whole operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorefrontError::TransientIo(_))
    }
}

pub type Result<T, E = StorefrontError> = std::result::Result<T, E>;
