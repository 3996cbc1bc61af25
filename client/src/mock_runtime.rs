//! A runtime with both pallets, and the client seams served from its storage.
//!
//! The seams read and dispatch against the externalities of the current thread, so futures
//! using them must be driven inside `TestExternalities::execute_with`.

use crate::{
    AssetId, CollectionId, TokenId,
    error::StoreError,
    gateway::{ChainGateway, DropCall, DropEvent, GatewayError, Receipt, TxHash},
    mock::{COIN, NOW, alice},
    oracle::OracleBackend,
    store::EncryptedBalanceStore,
};
use frame_support::{
    PalletId, derive_impl, parameter_types,
    traits::{ConstU64, PalletInfoAccess},
};
use pallet_confidential_balances::{Handle, input_binding, plaintext::PlaintextCoprocessor};
use pallet_invisible_drop::{AirdropId, HoldingsInspect};
use parking_lot::Mutex;
use sp_core::H256;
use sp_runtime::{
    AccountId32, BuildStorage, DispatchError, ModuleError, traits::IdentityLookup,
};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

type Block = frame_system::mocking::MockBlock<Test>;

#[frame_support::runtime]
mod runtime {
    #[runtime::runtime]
    #[runtime::derive(
        RuntimeCall,
        RuntimeEvent,
        RuntimeError,
        RuntimeOrigin,
        RuntimeFreezeReason,
        RuntimeHoldReason,
        RuntimeSlashReason,
        RuntimeLockId,
        RuntimeTask,
        RuntimeViewFunction
    )]
    pub struct Test;

    #[runtime::pallet_index(0)]
    pub type System = frame_system::Pallet<Test>;

    #[runtime::pallet_index(1)]
    pub type Timestamp = pallet_timestamp::Pallet<Test>;

    #[runtime::pallet_index(2)]
    pub type ConfidentialBalances = pallet_confidential_balances::Pallet<Test>;

    #[runtime::pallet_index(3)]
    pub type InvisibleDrop = pallet_invisible_drop::Pallet<Test>;
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
    type Block = Block;
    type AccountId = AccountId32;
    type Lookup = IdentityLookup<AccountId32>;
}

impl pallet_timestamp::Config for Test {
    type Moment = u64;
    type OnTimestampSet = ();
    type MinimumPeriod = ConstU64<1>;
    type WeightInfo = ();
}

parameter_types! {
    pub const MaxNameLength: u32 = 16;
    pub const MaxProofLength: u32 = 64;
    pub const InvisibleDropPalletId: PalletId = PalletId(*b"py/idrop");
}

impl pallet_confidential_balances::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type AssetId = AssetId;
    type Coprocessor = PlaintextCoprocessor;
    type MaxNameLength = MaxNameLength;
    type MaxProofLength = MaxProofLength;
}

impl pallet_invisible_drop::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type CollectionId = CollectionId;
    type TokenId = TokenId;
    type Holdings = NoHoldings;
    type UnixTime = Timestamp;
    type PalletId = InvisibleDropPalletId;
}

/// Nobody holds anything; only open airdrops can be claimed.
pub struct NoHoldings;

impl HoldingsInspect<AccountId32, CollectionId, TokenId> for NoHoldings {
    fn nft_count(_collection: &CollectionId, _who: &AccountId32) -> u32 {
        0
    }

    fn token_balance(_token: &TokenId, _who: &AccountId32) -> u128 {
        0
    }
}

/// `COIN` exists and is owned by `alice()`; no balance is minted yet.
pub fn new_test_ext() -> sp_io::TestExternalities {
    PlaintextCoprocessor::reset();
    let storage = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();

    let mut ext = sp_io::TestExternalities::new(storage);
    ext.execute_with(|| {
        System::set_block_number(1);
        Timestamp::set_timestamp(NOW * 1000);
        ConfidentialBalances::create_token(
            RuntimeOrigin::signed(alice()),
            COIN,
            b"Drop Coin".to_vec(),
            b"DROP".to_vec(),
            18,
        )
        .unwrap();
    });
    ext
}

/// Mint `value` of `COIN` to `to`, as its owner `alice()`.
pub fn mint(to: &AccountId32, value: u64) {
    let (handle, proof) = PlaintextCoprocessor::encrypt_input(value, input_binding(&COIN, &alice()));
    ConfidentialBalances::mint(RuntimeOrigin::signed(alice()), COIN, to.clone(), handle, proof)
        .unwrap();
}

/// Encrypted deposit of `value` by `from` into the escrow of `airdrop_id`.
pub fn encrypted_deposit(airdrop_id: AirdropId, from: &AccountId32, value: u64) -> (Handle, Vec<u8>) {
    let binding = input_binding(&InvisibleDrop::input_target(airdrop_id), from);
    PlaintextCoprocessor::encrypt_input(value, binding)
}

/// Balances and ACL of `ConfidentialBalances`, decrypted by the development coprocessor.
#[derive(Default)]
pub struct RuntimeLedger {
    decryptions: AtomicUsize,
}

impl RuntimeLedger {
    pub fn decryptions(&self) -> usize {
        self.decryptions.load(Ordering::Relaxed)
    }
}

impl EncryptedBalanceStore for &RuntimeLedger {
    async fn encrypted_handle(&self, asset: AssetId, owner: &AccountId32) -> Result<Handle, StoreError> {
        Ok(ConfidentialBalances::encrypted_balance_of(asset, owner))
    }
}

impl OracleBackend for &RuntimeLedger {
    fn is_allowed(&self, handle: &Handle, who: &AccountId32) -> Result<bool, String> {
        Ok(ConfidentialBalances::is_allowed(*handle, who))
    }

    fn decrypt(&self, handle: &Handle) -> Result<u64, String> {
        self.decryptions.fetch_add(1, Ordering::Relaxed);
        PlaintextCoprocessor::decrypt(*handle).ok_or_else(|| format!("unknown handle {handle:?}"))
    }
}

/// Submitted calls, dispatched into `InvisibleDrop` on confirmation.
#[derive(Default)]
pub struct RuntimeChain {
    pending: Mutex<(u64, BTreeMap<TxHash, (AccountId32, DropCall)>)>,
}

impl RuntimeChain {
    pub fn gateway(&self, who: AccountId32) -> RuntimeGateway<'_> {
        RuntimeGateway { chain: self, who }
    }
}

pub struct RuntimeGateway<'a> {
    chain: &'a RuntimeChain,
    who: AccountId32,
}

impl ChainGateway for RuntimeGateway<'_> {
    async fn submit_transaction(&self, call: DropCall) -> Result<TxHash, GatewayError> {
        let mut pending = self.chain.pending.lock();
        pending.0 += 1;
        let tx = H256::from_low_u64_be(pending.0);
        pending.1.insert(tx, (self.who.clone(), call));
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: TxHash, _confirmations: u32) -> Result<Receipt, GatewayError> {
        let (who, call) = self
            .chain
            .pending
            .lock()
            .1
            .remove(&tx)
            .ok_or_else(|| GatewayError::Transport("unknown transaction".into()))?;
        let event = dispatch(who, call).map_err(dispatch_failure)?;
        Ok(Receipt { tx_hash: tx, block_number: System::block_number(), events: vec![event] })
    }
}

fn dispatch(who: AccountId32, call: DropCall) -> Result<DropEvent, DispatchError> {
    let origin = RuntimeOrigin::signed(who);
    match call {
        DropCall::CreateAirdrop { reward_asset, reward_per_user, end_time, conditions } => {
            let airdrop_id = InvisibleDrop::airdrop_count();
            InvisibleDrop::create_airdrop(origin, reward_asset, reward_per_user, end_time, conditions)?;
            Ok(DropEvent::AirdropCreated { airdrop_id })
        },
        DropCall::DepositRewards { airdrop_id, encrypted_amount, proof } => {
            InvisibleDrop::deposit_rewards(origin, airdrop_id, encrypted_amount, proof)?;
            Ok(DropEvent::RewardsDeposited { airdrop_id })
        },
        DropCall::ClaimReward { airdrop_id } => {
            InvisibleDrop::claim_reward(origin, airdrop_id)?;
            Ok(DropEvent::RewardClaimed { airdrop_id })
        },
    }
}

fn dispatch_failure(e: DispatchError) -> GatewayError {
    let pallet = match e {
        DispatchError::Module(ModuleError { index, .. })
            if usize::from(index) == <InvisibleDrop as PalletInfoAccess>::index() =>
            <InvisibleDrop as PalletInfoAccess>::name(),
        DispatchError::Module(ModuleError { index, .. })
            if usize::from(index) == <ConfidentialBalances as PalletInfoAccess>::index() =>
            <ConfidentialBalances as PalletInfoAccess>::name(),
        _ => "System",
    };
    let error: &'static str = e.into();
    GatewayError::Dispatch { pallet: pallet.into(), error: error.into() }
}
