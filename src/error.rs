use crate::signature::Role;

#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    #[error("missing or malformed input: {0}")]
    Validation(String),
    #[error("role {0:?} requires an authenticated signer")]
    IdentityRequired(Role),
    #[error("signer has already signed this contract as {0:?}")]
    DuplicateSignature(Role),
    #[error("a witness ({0}) is already attached to this signature")]
    DuplicateWitness(String),
    #[error("no signed {0:?} signature exists to witness")]
    MainSignatureNotFound(Role),
    #[error("signing token is invalid or has already been used")]
    InvalidToken,
    #[error("signing token has expired, request a fresh invite")]
    TokenExpired,
    #[error("failed to compute document digest: {0}")]
    Hashing(String),
}
