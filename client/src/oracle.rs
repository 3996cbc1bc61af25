//! The decryption oracle and a reference implementation of its checks.

use crate::grant::{DisclosureDomain, DisclosureRequest, MAX_VALIDITY_DAYS, TypedData};
use pallet_confidential_balances::Handle;
use sp_runtime::{AccountId32, traits::Verify};
use std::{
    future::Future,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

const LOG_TARGET: &str = "invisible-drop::oracle";

/// Seconds a grant may start ahead of the oracle's clock.
pub const MAX_CLOCK_SKEW: u64 = 60;

/// Plaintext released for one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosedValue {
    pub handle: Handle,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("authorization rejected: {0}")]
    AuthorizationRejected(String),
    #[error("grant expired")]
    GrantExpired,
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

pub trait DecryptionOracle {
    fn request_disclosure(
        &self,
        request: DisclosureRequest,
    ) -> impl Future<Output = Result<DisclosedValue, OracleError>> + Send;
}

impl<O: DecryptionOracle + Sync + ?Sized> DecryptionOracle for &O {
    async fn request_disclosure(&self, request: DisclosureRequest) -> Result<DisclosedValue, OracleError> {
        (**self).request_disclosure(request).await
    }
}

/// Ledger and key material the oracle decrypts with.
pub trait OracleBackend {
    /// Whether `who` is on the access list of `handle`.
    fn is_allowed(&self, handle: &Handle, who: &AccountId32) -> Result<bool, String>;

    fn decrypt(&self, handle: &Handle) -> Result<u64, String>;
}

/// Unix time in seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Oracle that releases a plaintext only to the holder of a valid grant.
///
/// Checks, in order: the owner's signature over the grant, the session key's signature over
/// the request, the validity window, the grant's scope and the owner's access to the handle.
/// A grant may start up to [`MAX_CLOCK_SKEW`] seconds ahead of the oracle's clock.
pub struct GrantVerifyingOracle<B, C = SystemClock> {
    domain: DisclosureDomain,
    backend: B,
    clock: C,
}

impl<B: OracleBackend> GrantVerifyingOracle<B> {
    pub fn new(domain: DisclosureDomain, backend: B) -> Self {
        Self::with_clock(domain, backend, SystemClock)
    }
}

impl<B: OracleBackend, C: Clock> GrantVerifyingOracle<B, C> {
    pub fn with_clock(domain: DisclosureDomain, backend: B, clock: C) -> Self {
        Self { domain, backend, clock }
    }

    fn authorize(&self, request: &DisclosureRequest) -> Result<(), OracleError> {
        let grant = &request.grant;
        let typed = TypedData::new(self.domain.clone(), grant.request.clone());
        if !grant.signature.verify(&typed.signing_payload()[..], &grant.owner) {
            return Err(OracleError::AuthorizationRejected("owner signature invalid".into()));
        }
        if !request.verify_session_signature() {
            return Err(OracleError::AuthorizationRejected("session signature invalid".into()));
        }

        let duration = grant.request.duration_days;
        if !(1..=MAX_VALIDITY_DAYS).contains(&duration) {
            return Err(OracleError::AuthorizationRejected(format!(
                "validity of {duration} days not accepted"
            )));
        }
        let now = self.clock.now();
        if now.saturating_add(MAX_CLOCK_SKEW) < grant.request.start_timestamp {
            return Err(OracleError::AuthorizationRejected("grant not yet valid".into()));
        }
        if now >= grant.request.expires_at() {
            return Err(OracleError::GrantExpired);
        }

        if !grant.request.covers(request.asset) {
            return Err(OracleError::AuthorizationRejected(format!(
                "grant does not cover token {}",
                request.asset
            )));
        }
        let allowed = self
            .backend
            .is_allowed(&request.handle, &grant.owner)
            .map_err(OracleError::Unavailable)?;
        if !allowed {
            return Err(OracleError::AuthorizationRejected("owner may not access handle".into()));
        }
        Ok(())
    }
}

impl<B: OracleBackend + Sync, C: Clock + Sync> DecryptionOracle for GrantVerifyingOracle<B, C> {
    async fn request_disclosure(&self, request: DisclosureRequest) -> Result<DisclosedValue, OracleError> {
        if let Err(e) = self.authorize(&request) {
            log::debug!(target: LOG_TARGET, "refused disclosure of {:?}: {e}", request.handle);
            return Err(e);
        }
        let value = self.backend.decrypt(&request.handle).map_err(OracleError::Unavailable)?;
        Ok(DisclosedValue { handle: request.handle, value })
    }
}
