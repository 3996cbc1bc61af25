//! Disclosure of a confidential balance to its owner.

use crate::{
    AssetId,
    error::DisclosureError,
    gateway::TypedDataSigner,
    grant::{
        DEFAULT_VALIDITY_DAYS, DecryptionGrant, DisclosureDomain, DisclosureRequest,
        MAX_VALIDITY_DAYS, SessionKey, TypedData, UserDecryptRequest,
    },
    oracle::{Clock, DecryptionOracle, OracleError, SystemClock},
    store::EncryptedBalanceStore,
};
use pallet_confidential_balances::ZERO_HANDLE;
use sp_runtime::AccountId32;

const LOG_TARGET: &str = "invisible-drop::disclosure";

#[derive(Debug, Clone)]
pub struct DisclosureConfig {
    /// Oracle the grants are addressed to.
    pub domain: DisclosureDomain,
    /// Validity of each grant, `1..=MAX_VALIDITY_DAYS`.
    pub validity_days: u32,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self { domain: DisclosureDomain::default(), validity_days: DEFAULT_VALIDITY_DAYS }
    }
}

impl From<OracleError> for DisclosureError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::AuthorizationRejected(reason) => Self::AuthorizationRejected(reason),
            OracleError::GrantExpired => Self::GrantExpired,
            OracleError::Unavailable(reason) => Self::OracleUnavailable(reason),
        }
    }
}

/// Runs the disclosure handshake against a balance store and a decryption oracle.
///
/// Every call to [`Discloser::disclose`] uses its own session key and grant; nothing is shared
/// between concurrent disclosures.
pub struct Discloser<S, O, G, C = SystemClock> {
    store: S,
    oracle: O,
    signer: G,
    clock: C,
    config: DisclosureConfig,
}

impl<S, O, G> Discloser<S, O, G>
where
    S: EncryptedBalanceStore,
    O: DecryptionOracle,
    G: TypedDataSigner,
{
    pub fn new(store: S, oracle: O, signer: G, config: DisclosureConfig) -> Result<Self, DisclosureError> {
        Self::with_clock(store, oracle, signer, SystemClock, config)
    }
}

impl<S, O, G, C> Discloser<S, O, G, C>
where
    S: EncryptedBalanceStore,
    O: DecryptionOracle,
    G: TypedDataSigner,
    C: Clock,
{
    pub fn with_clock(
        store: S,
        oracle: O,
        signer: G,
        clock: C,
        config: DisclosureConfig,
    ) -> Result<Self, DisclosureError> {
        if !(1..=MAX_VALIDITY_DAYS).contains(&config.validity_days) {
            return Err(DisclosureError::InvalidValidity(config.validity_days));
        }
        Ok(Self { store, oracle, signer, clock, config })
    }

    /// Plaintext balance of `owner` in `asset`.
    ///
    /// The value is for display only and goes stale with the next balance change.
    pub async fn disclose(&self, asset: AssetId, owner: &AccountId32) -> Result<u64, DisclosureError> {
        let handle = self.store.encrypted_handle(asset, owner).await?;
        if handle == ZERO_HANDLE {
            log::debug!(target: LOG_TARGET, "no balance recorded for {owner} in {asset}");
            return Ok(0);
        }

        let session = SessionKey::generate();
        let request = UserDecryptRequest {
            public_key: session.public(),
            contracts: vec![asset],
            start_timestamp: self.clock.now(),
            duration_days: self.config.validity_days,
        };
        let typed = TypedData::new(self.config.domain.clone(), request);
        let signature = self
            .signer
            .sign_typed_data(&typed)
            .await
            .map_err(|e| DisclosureError::SigningFailed(e.to_string()))?;

        let grant = DecryptionGrant { request: typed.message, owner: owner.clone(), signature };
        let disclosure = DisclosureRequest::new(handle, asset, grant, &session);
        drop(session);

        let disclosed = self.oracle.request_disclosure(disclosure).await?;
        if disclosed.handle != handle {
            log::warn!(
                target: LOG_TARGET,
                "oracle answered for {:?} instead of {handle:?}",
                disclosed.handle
            );
            return Err(DisclosureError::HandleMismatch { requested: handle, received: disclosed.handle });
        }
        Ok(disclosed.value)
    }
}
