//! Decryption grants and the per-session key they are issued to.
//!
//! A grant is the owner's signed consent for one session key to have balances of a fixed set
//! of tokens disclosed during a bounded time window. The owner signs a typed-data payload that
//! commits to every field of the request, so none can be changed after signing.

use crate::AssetId;
use codec::{Decode, Encode};
use pallet_confidential_balances::Handle;
use sp_core::{H160, Pair, hashing::keccak_256, sr25519};
use sp_runtime::{AccountId32, MultiSignature};

/// Validity of a grant unless configured otherwise.
pub const DEFAULT_VALIDITY_DAYS: u32 = 1;
/// Longest validity an oracle accepts.
pub const MAX_VALIDITY_DAYS: u32 = 365;
pub const SECONDS_PER_DAY: u64 = 86_400;

const DOMAIN_TYPE: &[u8] = b"DisclosureDomain(string name,uint64 chainId,address verifyingContract)";
const REQUEST_TYPE: &[u8] = b"UserDecryptRequestVerification(bytes32 publicKey,uint32[] contracts,uint64 startTimestamp,uint32 durationDays)";
const DISCLOSURE_TAG: &[u8] = b"invisible-drop/disclose";

/// Identifies the oracle a grant is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DisclosureDomain {
    pub name: Vec<u8>,
    pub chain_id: u64,
    pub verifying_contract: H160,
}

impl Default for DisclosureDomain {
    fn default() -> Self {
        Self { name: b"Decryption".to_vec(), chain_id: 0, verifying_contract: H160::zero() }
    }
}

/// What the owner consents to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct UserDecryptRequest {
    /// Session key the disclosure may be requested with.
    pub public_key: sr25519::Public,
    /// Tokens whose balances may be disclosed.
    pub contracts: Vec<AssetId>,
    /// Unix seconds.
    pub start_timestamp: u64,
    pub duration_days: u32,
}

impl UserDecryptRequest {
    /// First instant the grant is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(u64::from(self.duration_days).saturating_mul(SECONDS_PER_DAY))
    }

    pub fn covers(&self, asset: AssetId) -> bool {
        self.contracts.contains(&asset)
    }
}

/// Structured data handed to the owner's signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedData {
    pub domain: DisclosureDomain,
    pub message: UserDecryptRequest,
}

impl TypedData {
    pub fn new(domain: DisclosureDomain, message: UserDecryptRequest) -> Self {
        Self { domain, message }
    }

    /// `keccak(0x19 0x01 ‖ hash(domain) ‖ hash(message))`.
    pub fn signing_payload(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(&hash_struct(DOMAIN_TYPE, &self.domain));
        preimage.extend_from_slice(&hash_struct(REQUEST_TYPE, &self.message));
        keccak_256(&preimage)
    }
}

fn hash_struct<T: Encode>(type_descriptor: &[u8], value: &T) -> [u8; 32] {
    keccak_256(&(keccak_256(type_descriptor), value).encode())
}

/// A request together with the owner's signature over its typed-data payload.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DecryptionGrant {
    pub request: UserDecryptRequest,
    pub owner: AccountId32,
    pub signature: MultiSignature,
}

/// Single-use key pair of one disclosure session.
///
/// Not `Clone`: the secret stays inside this value and is gone once it is dropped.
pub struct SessionKey {
    pair: sr25519::Pair,
}

impl SessionKey {
    pub fn generate() -> Self {
        let (pair, _seed) = sr25519::Pair::generate();
        Self { pair }
    }

    pub fn public(&self) -> sr25519::Public {
        self.pair.public()
    }

    fn sign(&self, payload: &[u8]) -> sr25519::Signature {
        self.pair.sign(payload)
    }
}

impl core::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionKey").field("public", &self.public()).finish_non_exhaustive()
    }
}

/// One concrete disclosure, as sent to the oracle.
///
/// The session key signs `(handle, asset, grant)`, so a grant alone cannot be replayed for
/// another handle without the session secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureRequest {
    pub handle: Handle,
    pub asset: AssetId,
    pub grant: DecryptionGrant,
    pub session_signature: sr25519::Signature,
}

impl DisclosureRequest {
    pub fn new(handle: Handle, asset: AssetId, grant: DecryptionGrant, session: &SessionKey) -> Self {
        let session_signature = session.sign(&Self::session_payload(&handle, asset, &grant));
        Self { handle, asset, grant, session_signature }
    }

    pub fn session_payload(handle: &Handle, asset: AssetId, grant: &DecryptionGrant) -> [u8; 32] {
        keccak_256(&(DISCLOSURE_TAG, handle, asset, grant).encode())
    }

    /// Whether the session key named in the grant signed this request.
    pub fn verify_session_signature(&self) -> bool {
        let payload = Self::session_payload(&self.handle, self.asset, &self.grant);
        sr25519::Pair::verify(&self.session_signature, payload, &self.grant.request.public_key)
    }
}
