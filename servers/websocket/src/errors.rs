use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("endpoint path already registered: {0}")]
    DuplicatePath(String),
    #[error("endpoint registration is closed once a handshake has been served")]
    AddNotAllowed,
    #[error("encoder declared by endpoint {endpoint} cannot be instantiated: {reason}")]
    EncoderInvalid { endpoint: String, reason: String },
    #[error("endpoint declares no request path")]
    MissingAnnotation,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
