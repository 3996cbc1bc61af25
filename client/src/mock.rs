use crate::{
    AssetId,
    error::StoreError,
    gateway::{ChainGateway, DropCall, DropEvent, GatewayError, Receipt, TxHash, TypedDataSigner},
    grant::{
        DecryptionGrant, DisclosureDomain, DisclosureRequest, SessionKey, TypedData,
        UserDecryptRequest,
    },
    oracle::{Clock, DecryptionOracle, DisclosedValue, OracleBackend, OracleError},
    store::EncryptedBalanceStore,
};
use pallet_confidential_balances::Handle;
use pallet_invisible_drop::AirdropId;
use parking_lot::Mutex;
use sp_core::{H256, sr25519};
use sp_keyring::Sr25519Keyring;
use sp_runtime::{AccountId32, MultiSignature};
use std::collections::{BTreeMap, BTreeSet};

pub const COIN: AssetId = 7;
pub const OTHER_COIN: AssetId = 8;
pub const NOW: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;

pub fn alice() -> AccountId32 {
    Sr25519Keyring::Alice.to_account_id()
}

pub fn bob() -> AccountId32 {
    Sr25519Keyring::Bob.to_account_id()
}

#[derive(Default)]
struct LedgerState {
    next_handle: u64,
    balances: BTreeMap<(AssetId, AccountId32), Handle>,
    cleartexts: BTreeMap<Handle, u64>,
    acl: BTreeSet<(Handle, AccountId32)>,
    decryptions: usize,
    store_down: bool,
}

/// Confidential balances and the oracle's view of them.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    /// Record a new balance handle for `owner` and allow the owner on it.
    pub fn credit(&self, asset: AssetId, owner: &AccountId32, value: u64) -> Handle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = H256::from_low_u64_be(state.next_handle);
        state.balances.insert((asset, owner.clone()), handle);
        state.cleartexts.insert(handle, value);
        state.acl.insert((handle, owner.clone()));
        handle
    }

    pub fn decryptions(&self) -> usize {
        self.state.lock().decryptions
    }

    pub fn set_store_down(&self, down: bool) {
        self.state.lock().store_down = down;
    }
}

impl EncryptedBalanceStore for &MockLedger {
    async fn encrypted_handle(&self, asset: AssetId, owner: &AccountId32) -> Result<Handle, StoreError> {
        let state = self.state.lock();
        if state.store_down {
            return Err(StoreError("node unreachable".into()));
        }
        Ok(state.balances.get(&(asset, owner.clone())).copied().unwrap_or_default())
    }
}

impl OracleBackend for &MockLedger {
    fn is_allowed(&self, handle: &Handle, who: &AccountId32) -> Result<bool, String> {
        Ok(self.state.lock().acl.contains(&(*handle, who.clone())))
    }

    fn decrypt(&self, handle: &Handle) -> Result<u64, String> {
        let mut state = self.state.lock();
        state.decryptions += 1;
        state.cleartexts.get(handle).copied().ok_or_else(|| format!("unknown handle {handle:?}"))
    }
}

pub struct MockClock(Mutex<u64>);

impl MockClock {
    pub fn at(now: u64) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: u64) {
        *self.0.lock() = now;
    }
}

impl Clock for &MockClock {
    fn now(&self) -> u64 {
        *self.0.lock()
    }
}

/// Wallet holding a development key.
pub struct KeyringSigner(pub Sr25519Keyring);

impl TypedDataSigner for KeyringSigner {
    async fn sign_typed_data(&self, data: &TypedData) -> Result<MultiSignature, GatewayError> {
        Ok(MultiSignature::Sr25519(self.0.sign(&data.signing_payload())))
    }
}

/// Wallet whose user declines every signature request.
pub struct RejectingSigner;

impl TypedDataSigner for RejectingSigner {
    async fn sign_typed_data(&self, _data: &TypedData) -> Result<MultiSignature, GatewayError> {
        Err(GatewayError::Transport("user rejected the request".into()))
    }
}

pub struct UnreachableOracle;

impl DecryptionOracle for UnreachableOracle {
    async fn request_disclosure(&self, _request: DisclosureRequest) -> Result<DisclosedValue, OracleError> {
        Err(OracleError::Unavailable("connection refused".into()))
    }
}

/// Answers with the value of the requested handle, labelled as another handle.
pub struct RedirectingOracle<O> {
    pub inner: O,
    pub to: Handle,
}

impl<O: DecryptionOracle + Sync> DecryptionOracle for RedirectingOracle<O> {
    async fn request_disclosure(&self, request: DisclosureRequest) -> Result<DisclosedValue, OracleError> {
        let disclosed = self.inner.request_disclosure(request).await?;
        Ok(DisclosedValue { handle: self.to, ..disclosed })
    }
}

/// Records the session key of every request it forwards.
pub struct RecordingOracle<O> {
    pub inner: O,
    pub session_keys: Mutex<Vec<sr25519::Public>>,
}

impl<O> RecordingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self { inner, session_keys: Mutex::new(Vec::new()) }
    }
}

impl<O: DecryptionOracle + Sync> DecryptionOracle for RecordingOracle<O> {
    async fn request_disclosure(&self, request: DisclosureRequest) -> Result<DisclosedValue, OracleError> {
        self.session_keys.lock().push(request.grant.request.public_key);
        self.inner.request_disclosure(request).await
    }
}

/// A disclosure request for `handle` of `asset`, with a grant over `scope` signed by `signer`
/// in the name of `owner`.
pub fn signed_disclosure(
    signer: Sr25519Keyring,
    owner: AccountId32,
    handle: Handle,
    asset: AssetId,
    scope: Vec<AssetId>,
    start_timestamp: u64,
    duration_days: u32,
) -> DisclosureRequest {
    let session = SessionKey::generate();
    let typed = TypedData::new(
        DisclosureDomain::default(),
        UserDecryptRequest { public_key: session.public(), contracts: scope, start_timestamp, duration_days },
    );
    let signature = MultiSignature::Sr25519(signer.sign(&typed.signing_payload()));
    let grant = DecryptionGrant { request: typed.message, owner, signature };
    DisclosureRequest::new(handle, asset, grant, &session)
}

struct Airdrop {
    end_time: u64,
    claimed: BTreeSet<AccountId32>,
}

/// How the gateway misbehaves. Calls still execute in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Confirmations time out.
    Stalled,
    /// The connection drops while waiting for confirmation.
    ConnectionReset,
    /// Broadcasting times out before a hash is returned.
    BroadcastTimeout,
}

#[derive(Default)]
struct ChainState {
    now: u64,
    next_tx: u64,
    next_airdrop: AirdropId,
    airdrops: BTreeMap<AirdropId, Airdrop>,
    pending: BTreeMap<TxHash, (AccountId32, DropCall)>,
    fault: Option<Fault>,
}

/// Executes airdrop calls against an in-memory model of the pallet.
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self { state: Mutex::new(ChainState { now: NOW, ..Default::default() }) }
    }

    pub fn set_now(&self, now: u64) {
        self.state.lock().now = now;
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        self.state.lock().fault = fault;
    }

    /// Gateway submitting as `who`.
    pub fn gateway(&self, who: AccountId32) -> MockGateway<'_> {
        MockGateway { chain: self, who }
    }

    fn execute(state: &mut ChainState, who: AccountId32, call: DropCall) -> Result<DropEvent, GatewayError> {
        let fail = |error: &str| GatewayError::Dispatch { pallet: "InvisibleDrop".into(), error: error.into() };
        match call {
            DropCall::CreateAirdrop { reward_per_user, end_time, .. } => {
                if reward_per_user == 0 || end_time <= state.now {
                    return Err(fail("InvalidParameters"));
                }
                let airdrop_id = state.next_airdrop;
                state.next_airdrop += 1;
                state.airdrops.insert(airdrop_id, Airdrop { end_time, claimed: BTreeSet::new() });
                Ok(DropEvent::AirdropCreated { airdrop_id })
            },
            DropCall::DepositRewards { airdrop_id, .. } => {
                if !state.airdrops.contains_key(&airdrop_id) {
                    return Err(fail("AirdropNotFound"));
                }
                Ok(DropEvent::RewardsDeposited { airdrop_id })
            },
            DropCall::ClaimReward { airdrop_id } => {
                let now = state.now;
                let airdrop = state.airdrops.get_mut(&airdrop_id).ok_or_else(|| fail("AirdropNotFound"))?;
                if now >= airdrop.end_time {
                    return Err(fail("NotEligible"));
                }
                if !airdrop.claimed.insert(who) {
                    return Err(fail("AlreadyClaimed"));
                }
                Ok(DropEvent::RewardClaimed { airdrop_id })
            },
        }
    }
}

pub struct MockGateway<'a> {
    chain: &'a MockChain,
    who: AccountId32,
}

impl ChainGateway for MockGateway<'_> {
    async fn submit_transaction(&self, call: DropCall) -> Result<TxHash, GatewayError> {
        let mut state = self.chain.state.lock();
        if state.fault == Some(Fault::BroadcastTimeout) {
            // Errors are dropped; the caller learns nothing either way.
            let _ = MockChain::execute(&mut state, self.who.clone(), call);
            return Err(GatewayError::Timeout);
        }
        state.next_tx += 1;
        let tx = H256::from_low_u64_be(state.next_tx);
        state.pending.insert(tx, (self.who.clone(), call));
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: TxHash, _confirmations: u32) -> Result<Receipt, GatewayError> {
        let mut state = self.chain.state.lock();
        let (who, call) =
            state.pending.remove(&tx).ok_or_else(|| GatewayError::Transport("unknown transaction".into()))?;
        let event = MockChain::execute(&mut state, who, call)?;
        match state.fault {
            Some(Fault::Stalled) => return Err(GatewayError::Timeout),
            Some(Fault::ConnectionReset) =>
                return Err(GatewayError::Transport("connection reset".into())),
            _ => {},
        }
        Ok(Receipt { tx_hash: tx, block_number: state.next_tx, events: vec![event] })
    }
}
