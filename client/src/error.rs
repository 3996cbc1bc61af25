use crate::gateway::TxHash;
use pallet_confidential_balances::Handle;
use thiserror::Error;

/// The balance store could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Failure of a balance disclosure.
///
/// Protocol violations (`AuthorizationRejected`, `GrantExpired`, `HandleMismatch`) may be
/// resolved by running the handshake again with a fresh grant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisclosureError {
    #[error("authorization rejected: {0}")]
    AuthorizationRejected(String),
    #[error("decryption grant expired")]
    GrantExpired,
    #[error("oracle answered for handle {received:?}, requested {requested:?}")]
    HandleMismatch { requested: Handle, received: Handle },
    #[error("decryption oracle unavailable: {0}")]
    OracleUnavailable(String),
    #[error("balance store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("owner did not sign the grant: {0}")]
    SigningFailed(String),
    #[error("grant validity of {0} days is outside 1..={max}", max = crate::grant::MAX_VALIDITY_DAYS)]
    InvalidValidity(u32),
}

impl DisclosureError {
    /// Transient infrastructure failures, safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleUnavailable(_) | Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for DisclosureError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e.0)
    }
}

/// Failure of an airdrop transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropError {
    #[error("invalid airdrop parameters")]
    InvalidParameters,
    #[error("airdrop not found")]
    AirdropNotFound,
    #[error("not eligible for this airdrop")]
    NotEligible,
    #[error("reward already claimed")]
    AlreadyClaimed,
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    /// The transaction was broadcast but its outcome is unknown. It may still commit.
    #[error("transaction {0:?} not confirmed yet")]
    ConfirmationPending(TxHash),
    /// Broadcasting timed out before a hash came back; the transaction may have gone out.
    #[error("submission outcome unknown")]
    SubmissionUncertain,
}

impl DropError {
    /// Business-rule rejections fail the same way when retried unchanged. Pending and
    /// uncertain submissions must be reconciled against chain state first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailed(_))
    }
}
