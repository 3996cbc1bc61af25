//! # Invisible Drop Pallet
//!
//! Gated airdrops paid out in confidential tokens.
//!
//! ## Overview
//!
//! A distributor creates an airdrop with a fixed reward per user, an expiry time and a set of
//! [`EligibilityConditions`] over public holdings (an NFT collection, a minimum balance of a
//! fungible token, both, or none). Rewards are escrowed as encrypted balances in
//! `pallet-confidential-balances`, so neither the funded total nor any claimant's balance is
//! visible on chain.
//!
//! ### Lifecycle
//!
//! - `create_airdrop`: allocates the next sequential id and stores the airdrop. The conditions
//!   and reward terms are immutable from then on.
//! - `deposit_rewards`: moves an encrypted amount from the caller into the airdrop's escrow.
//!   May be called any number of times, also after expiry.
//! - `claim_reward`: pays `reward_per_user` to the caller, at most once per airdrop.
//!
//! An airdrop is active while `now < end_time`. Activity is derived from the clock, never stored.
//!
//! ### Claims
//!
//! Each `(airdrop, account)` pair is either not claimed or claimed, with a single forward
//! transition. `claim_reward` re-checks expiry, conditions and the claimed flag when it executes,
//! and the whole dispatch is one storage transaction: when two claims for the same pair race,
//! the second one to execute observes the flag and fails with `AlreadyClaimed`. The read-only
//! [`Pallet::check_eligibility`] is advisory and may be stale by the time a claim executes.
//!
//! ### Escrow
//!
//! Funds of airdrop `id` sit in the confidential balance of the sub-account
//! `PalletId.into_sub_account_truncating(id)`. Payouts are confidential transfers, so an
//! under-funded escrow pays an encrypted zero rather than failing observably.

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod eligibility;

use alloc::vec::Vec;
use codec::DecodeWithMemTracking;
use frame_support::{
    PalletId,
    dispatch::DispatchResult,
    pallet_prelude::*,
    traits::{Get, UnixTime},
};
use frame_system::pallet_prelude::*;
use pallet_confidential_balances::{FheCoprocessor, Handle, ZERO_HANDLE};
use sp_runtime::{ArithmeticError, traits::AccountIdConversion};

pub use eligibility::{EligibilityConditions, HoldingsInspect, Predicate, TokenThreshold};
pub use pallet::*;

const LOG_TARGET: &str = "runtime::invisible-drop";

/// Sequential airdrop identifier.
pub type AirdropId = u64;

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    /// The current storage version.
    const STORAGE_VERSION: StorageVersion = StorageVersion::new(1);

    #[pallet::pallet]
    #[pallet::storage_version(STORAGE_VERSION)]
    pub struct Pallet<T>(_);

    /// Configure the pallet by specifying the parameters and types on which it depends.
    #[pallet::config]
    pub trait Config: frame_system::Config + pallet_confidential_balances::Config {
        /// Because this pallet emits events, it depends on the runtime's definition of an event.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Identifier of an NFT collection that conditions may require.
        type CollectionId: Member + Parameter + DecodeWithMemTracking + MaxEncodedLen + Copy;

        /// Identifier of a public fungible token that conditions may require.
        type TokenId: Member + Parameter + DecodeWithMemTracking + MaxEncodedLen + Copy;

        /// Source of the public holdings conditions are evaluated against.
        type Holdings: HoldingsInspect<Self::AccountId, Self::CollectionId, Self::TokenId>;

        /// Wall clock used for `end_time` and `claim_time`.
        type UnixTime: UnixTime;

        /// The pallet's identifier, used for deriving escrow accounts.
        #[pallet::constant]
        type PalletId: Get<PalletId>;
    }

    pub type AssetIdOf<T> = <T as pallet_confidential_balances::Config>::AssetId;

    pub type ConditionsOf<T> =
        EligibilityConditions<<T as Config>::CollectionId, <T as Config>::TokenId>;

    pub type AirdropInfoOf<T> =
        AirdropInfo<<T as frame_system::Config>::AccountId, AssetIdOf<T>, ConditionsOf<T>>;

    /// An airdrop as created. Never modified afterwards.
    #[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    pub struct AirdropInfo<AccountId, AssetId, Conditions> {
        pub creator: AccountId,
        /// Confidential token the reward is paid in.
        pub reward_asset: AssetId,
        pub reward_per_user: u64,
        /// Unix seconds. The airdrop is inactive from this instant on.
        pub end_time: u64,
        pub conditions: Conditions,
    }

    /// Claim state of one account in one airdrop.
    #[derive(
        Encode, Decode, Clone, Copy, Default, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen,
    )]
    pub struct ClaimRecord {
        pub has_claimed: bool,
        /// Unix seconds of the claim, `0` while unclaimed.
        pub claim_time: u64,
    }

    /// An airdrop together with its derived activity flag.
    #[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo)]
    pub struct AirdropView<Info> {
        pub info: Info,
        pub is_active: bool,
    }

    /// Id the next airdrop will get; equal to the number of airdrops created.
    #[pallet::storage]
    #[pallet::getter(fn airdrop_count)]
    pub type NextAirdropId<T: Config> = StorageValue<_, AirdropId, ValueQuery>;

    #[pallet::storage]
    #[pallet::getter(fn airdrops)]
    pub type Airdrops<T: Config> =
        StorageMap<_, Twox64Concat, AirdropId, AirdropInfoOf<T>, OptionQuery>;

    /// Encrypted sum of everything deposited into an airdrop's escrow.
    #[pallet::storage]
    pub type FundedAmount<T: Config> = StorageMap<_, Twox64Concat, AirdropId, Handle, OptionQuery>;

    #[pallet::storage]
    pub type ClaimRecords<T: Config> = StorageDoubleMap<
        _,
        Twox64Concat,
        AirdropId,
        Blake2_128Concat,
        T::AccountId,
        ClaimRecord,
        ValueQuery,
    >;

    /// Events emitted by the pallet
    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A new airdrop was created.
        AirdropCreated {
            airdrop_id: AirdropId,
            creator: T::AccountId,
            reward_asset: AssetIdOf<T>,
            reward_per_user: u64,
            end_time: u64,
        },
        /// An undisclosed amount was added to the airdrop's escrow.
        RewardsDeposited { airdrop_id: AirdropId, who: T::AccountId },
        /// `who` claimed the reward of the airdrop.
        RewardClaimed { airdrop_id: AirdropId, who: T::AccountId },
    }

    /// Errors emitted by the pallet
    #[pallet::error]
    pub enum Error<T> {
        /// Zero reward, an end time that is not in the future, or an unknown reward token.
        InvalidParameters,
        /// No airdrop with this id.
        AirdropNotFound,
        /// The airdrop has expired or the caller does not meet its conditions.
        NotEligible,
        /// The caller already claimed this airdrop.
        AlreadyClaimed,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Create an airdrop paying `reward_per_user` of `reward_asset` until `end_time`.
        #[pallet::call_index(0)]
        #[pallet::weight(T::DbWeight::get().reads_writes(2, 2))]
        pub fn create_airdrop(
            origin: OriginFor<T>,
            reward_asset: AssetIdOf<T>,
            reward_per_user: u64,
            end_time: u64,
            conditions: ConditionsOf<T>,
        ) -> DispatchResult {
            let creator = ensure_signed(origin)?;

            ensure!(reward_per_user > 0, Error::<T>::InvalidParameters);
            ensure!(end_time > Self::now(), Error::<T>::InvalidParameters);
            ensure!(
                pallet_confidential_balances::Pallet::<T>::token_exists(reward_asset),
                Error::<T>::InvalidParameters
            );

            let airdrop_id = Self::airdrop_count();
            let next_id = airdrop_id.checked_add(1).ok_or(ArithmeticError::Overflow)?;

            Airdrops::<T>::insert(
                airdrop_id,
                AirdropInfo {
                    creator: creator.clone(),
                    reward_asset,
                    reward_per_user,
                    end_time,
                    conditions,
                },
            );
            NextAirdropId::<T>::put(next_id);

            log::debug!(target: LOG_TARGET, "airdrop {airdrop_id} created, ends at {end_time}");
            Self::deposit_event(Event::AirdropCreated {
                airdrop_id,
                creator,
                reward_asset,
                reward_per_user,
                end_time,
            });
            Ok(())
        }

        /// Add an encrypted amount of the reward token to the airdrop's escrow.
        ///
        /// The input must be bound to `(PalletId, airdrop_id)` and the caller. If the caller
        /// holds less than the amount, an encryption of zero is deposited.
        #[pallet::call_index(1)]
        #[pallet::weight(T::DbWeight::get().reads_writes(5, 6))]
        pub fn deposit_rewards(
            origin: OriginFor<T>,
            airdrop_id: AirdropId,
            encrypted_amount: Handle,
            proof: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let info = Self::airdrops(airdrop_id).ok_or(Error::<T>::AirdropNotFound)?;

            let amount = pallet_confidential_balances::Pallet::<T>::verify_input(
                &Self::input_target(airdrop_id),
                &who,
                encrypted_amount,
                &proof,
            )?;
            let moved = pallet_confidential_balances::Pallet::<T>::do_transfer(
                info.reward_asset,
                &who,
                &Self::escrow_account_id(airdrop_id),
                amount,
            )?;

            let funded = T::Coprocessor::add(Self::funded_amount(airdrop_id), moved);
            FundedAmount::<T>::insert(airdrop_id, funded);
            pallet_confidential_balances::Pallet::<T>::allow(funded, &info.creator);

            if !Self::is_active_at(&info, Self::now()) {
                log::debug!(target: LOG_TARGET, "deposit into expired airdrop {airdrop_id}");
            }
            Self::deposit_event(Event::RewardsDeposited { airdrop_id, who });
            Ok(())
        }

        /// Claim the reward of an airdrop.
        ///
        /// Expiry, conditions and the claimed flag are all checked as part of this dispatch.
        ///
        /// If the escrow holds less than `reward_per_user`, the claim still succeeds and is
        /// recorded, but an encryption of zero is paid out. `RewardClaimed` therefore does not
        /// prove payment; the claimant learns the amount only by disclosing their balance.
        #[pallet::call_index(2)]
        #[pallet::weight(T::DbWeight::get().reads_writes(7, 5))]
        pub fn claim_reward(origin: OriginFor<T>, airdrop_id: AirdropId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let info = Self::airdrops(airdrop_id).ok_or(Error::<T>::AirdropNotFound)?;
            let now = Self::now();

            ensure!(Self::meets_conditions(&info, &who, now), Error::<T>::NotEligible);

            ClaimRecords::<T>::try_mutate(airdrop_id, &who, |record| -> DispatchResult {
                ensure!(!record.has_claimed, Error::<T>::AlreadyClaimed);
                *record = ClaimRecord { has_claimed: true, claim_time: now };
                Ok(())
            })?;

            let reward = T::Coprocessor::trivial_encrypt(info.reward_per_user);
            pallet_confidential_balances::Pallet::<T>::do_transfer(
                info.reward_asset,
                &Self::escrow_account_id(airdrop_id),
                &who,
                reward,
            )?;

            log::debug!(target: LOG_TARGET, "airdrop {airdrop_id} claimed by {who:?}");
            Self::deposit_event(Event::RewardClaimed { airdrop_id, who });
            Ok(())
        }
    }

    /// Internal helper functions
    impl<T: Config> Pallet<T> {
        /// The account holding the escrowed rewards of `airdrop_id`.
        pub fn escrow_account_id(airdrop_id: AirdropId) -> T::AccountId {
            T::PalletId::get().into_sub_account_truncating(airdrop_id)
        }

        /// Encrypted inputs for `deposit_rewards` must be bound to this target.
        pub fn input_target(airdrop_id: AirdropId) -> (PalletId, AirdropId) {
            (T::PalletId::get(), airdrop_id)
        }

        /// Encrypted total deposited so far, [`ZERO_HANDLE`] if nothing was.
        pub fn funded_amount(airdrop_id: AirdropId) -> Handle {
            FundedAmount::<T>::get(airdrop_id).unwrap_or(ZERO_HANDLE)
        }

        pub fn claim_info(airdrop_id: AirdropId, who: &T::AccountId) -> ClaimRecord {
            ClaimRecords::<T>::get(airdrop_id, who)
        }

        pub fn airdrop_info(airdrop_id: AirdropId) -> Option<AirdropView<AirdropInfoOf<T>>> {
            let info = Self::airdrops(airdrop_id)?;
            let is_active = Self::is_active_at(&info, Self::now());
            Some(AirdropView { info, is_active })
        }

        pub fn is_active(airdrop_id: AirdropId) -> bool {
            Self::airdrops(airdrop_id).is_some_and(|info| Self::is_active_at(&info, Self::now()))
        }

        /// Whether `who` could claim right now: the airdrop exists and is active, its
        /// conditions hold and `who` has not claimed yet.
        ///
        /// Advisory only; `claim_reward` checks again when it executes.
        pub fn check_eligibility(airdrop_id: AirdropId, who: &T::AccountId) -> bool {
            let Some(info) = Self::airdrops(airdrop_id) else {
                return false;
            };
            Self::meets_conditions(&info, who, Self::now()) &&
                !Self::claim_info(airdrop_id, who).has_claimed
        }

        /// `reward_per_user` if [`Self::check_eligibility`] holds, `0` otherwise.
        pub fn check_claimable_amount(airdrop_id: AirdropId, who: &T::AccountId) -> u64 {
            if !Self::check_eligibility(airdrop_id, who) {
                return 0;
            }
            Self::airdrops(airdrop_id).map_or(0, |info| info.reward_per_user)
        }

        fn meets_conditions(info: &AirdropInfoOf<T>, who: &T::AccountId, now: u64) -> bool {
            Self::is_active_at(info, now) &&
                info.conditions.evaluate::<T::AccountId, T::Holdings>(who)
        }

        fn is_active_at(info: &AirdropInfoOf<T>, now: u64) -> bool {
            now < info.end_time
        }

        fn now() -> u64 {
            T::UnixTime::now().as_secs()
        }
    }
}
