/// Errors raised while deriving zkLogin identities or requesting proofs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZkLoginError {
    /// A claim does not fit the circuit's fixed byte budget.
    #[error("Claim {claim} is {length} bytes, circuit limit is {max}")]
    ClaimTooLong {
        claim: String,
        length: usize,
        max: usize,
    },

    #[error("Invalid JWT: {0}")]
    InvalidJwt(String),

    /// The token was issued for a different ephemeral key, epoch or randomness.
    #[error("JWT nonce {actual} does not match derived nonce {expected}")]
    NonceMismatch { expected: String, actual: String },

    /// The token cannot be tied to an ephemeral key without a nonce.
    #[error("JWT carries no nonce claim")]
    MissingNonce,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Poseidon hashing failed: {0}")]
    Poseidon(String),

    #[error("Proof generation failed: {0}")]
    ProofFailure(String),
}
