#![cfg_attr(not(feature = "std"), no_std)]

//! # Confidential Balances Pallet
//!
//! Holds fungible token balances as ciphertext handles. Amounts are never stored, emitted or
//! logged in the clear: minting and transfers combine handles through an external
//! homomorphic-encryption coprocessor (see [`FheCoprocessor`]).
//!
//! ## Overview
//!
//! - **Tokens**: any signed account may register a confidential token and becomes its owner.
//! - **Mint**: the owner adds an encrypted amount to an account's balance.
//! - **Transfer**: moves an encrypted amount between accounts. When the sender holds less than
//!   the amount, an encryption of zero is moved instead, so the outcome is not observable.
//! - **Access control**: every handle written for an account is recorded in [`Acl`]. Off-chain
//!   decryption services only disclose a handle to accounts listed there.
//!
//! ## Encrypted inputs
//!
//! Amounts enter the chain as `(handle, proof)` pairs produced by the client. The proof must
//! be bound to the receiving target and the caller, see [`input_binding`].
//!
//! ## Zero handle
//!
//! An account whose balance was never written reads as [`ZERO_HANDLE`]. Callers must treat it
//! as "no balance recorded", not as a ciphertext.

extern crate alloc;


pub mod coprocessor;
#[cfg(feature = "std")]
pub mod plaintext;

pub use coprocessor::{FheCoprocessor, Handle, ZERO_HANDLE, input_binding};
pub use pallet::*;

pub(crate) const LOG_TARGET: &str = "runtime::confidential-balances";

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use alloc::vec::Vec;
    use codec::DecodeWithMemTracking;
    use frame_support::{dispatch::DispatchResult, pallet_prelude::*};
    use frame_system::pallet_prelude::*;

    /// The current storage version.
    const STORAGE_VERSION: StorageVersion = StorageVersion::new(1);

    #[pallet::pallet]
    #[pallet::storage_version(STORAGE_VERSION)]
    pub struct Pallet<T>(_);

    #[pallet::config]
    pub trait Config: frame_system::Config {
        /// Because this pallet emits events, it depends on the runtime's definition of an event.
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Identifier of a confidential token.
        type AssetId: Member + Parameter + DecodeWithMemTracking + MaxEncodedLen + Copy;

        /// The homomorphic-encryption backend.
        type Coprocessor: FheCoprocessor;

        /// Maximum length of a token name or symbol.
        #[pallet::constant]
        type MaxNameLength: Get<u32>;

        /// Maximum length of an input proof.
        #[pallet::constant]
        type MaxProofLength: Get<u32>;
    }

    pub type NameOf<T> = BoundedVec<u8, <T as Config>::MaxNameLength>;

    /// Public metadata of a confidential token.
    #[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    pub struct TokenDetails<AccountId, Name> {
        /// The only account allowed to mint.
        pub owner: AccountId,
        pub name: Name,
        pub symbol: Name,
        pub decimals: u8,
        /// Encrypted sum of everything minted.
        pub total_supply: Handle,
    }

    pub type TokenDetailsOf<T> = TokenDetails<<T as frame_system::Config>::AccountId, NameOf<T>>;

    #[pallet::storage]
    #[pallet::getter(fn tokens)]
    pub type Tokens<T: Config> = StorageMap<_, Blake2_128Concat, T::AssetId, TokenDetailsOf<T>, OptionQuery>;

    /// Balance handle per (token, account). Absent means nothing was ever recorded.
    #[pallet::storage]
    pub type Balances<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        T::AssetId,
        Blake2_128Concat,
        T::AccountId,
        Handle,
        OptionQuery,
    >;

    /// Accounts allowed to request disclosure of a handle.
    #[pallet::storage]
    pub type Acl<T: Config> =
        StorageDoubleMap<_, Identity, Handle, Blake2_128Concat, T::AccountId, (), OptionQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// A confidential token was registered.
        TokenCreated { asset: T::AssetId, owner: T::AccountId },
        /// An undisclosed amount was minted to `to`.
        Minted { asset: T::AssetId, to: T::AccountId },
        /// An undisclosed amount, possibly zero, moved from `from` to `to`.
        Transferred { asset: T::AssetId, from: T::AccountId, to: T::AccountId },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// A token with this id is already registered.
        TokenAlreadyExists,
        /// The token id is not registered.
        UnknownToken,
        /// Only the token owner may mint.
        NotTokenOwner,
        /// Name or symbol exceeds `MaxNameLength`.
        NameTooLong,
        /// Proof exceeds `MaxProofLength`.
        ProofTooLong,
        /// The encrypted input is not bound to this target and caller.
        InvalidInputProof,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Register a new confidential token owned by the caller.
        #[pallet::call_index(0)]
        #[pallet::weight(T::DbWeight::get().reads_writes(1, 1))]
        pub fn create_token(
            origin: OriginFor<T>,
            asset: T::AssetId,
            name: Vec<u8>,
            symbol: Vec<u8>,
            decimals: u8,
        ) -> DispatchResult {
            let owner = ensure_signed(origin)?;
            ensure!(!Tokens::<T>::contains_key(asset), Error::<T>::TokenAlreadyExists);

            let name: NameOf<T> = name.try_into().map_err(|_| Error::<T>::NameTooLong)?;
            let symbol: NameOf<T> = symbol.try_into().map_err(|_| Error::<T>::NameTooLong)?;

            Tokens::<T>::insert(
                asset,
                TokenDetails { owner: owner.clone(), name, symbol, decimals, total_supply: ZERO_HANDLE },
            );
            Self::deposit_event(Event::TokenCreated { asset, owner });
            Ok(())
        }

        /// Mint an encrypted amount to `to`. Owner only.
        ///
        /// The input must be bound to `asset` and the caller.
        #[pallet::call_index(1)]
        #[pallet::weight(T::DbWeight::get().reads_writes(3, 4))]
        pub fn mint(
            origin: OriginFor<T>,
            asset: T::AssetId,
            to: T::AccountId,
            encrypted_amount: Handle,
            proof: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let details = Tokens::<T>::get(asset).ok_or(Error::<T>::UnknownToken)?;
            ensure!(details.owner == who, Error::<T>::NotTokenOwner);

            let amount = Self::verify_input(&asset, &who, encrypted_amount, &proof)?;
            Self::do_mint(asset, &to, amount)
        }

        /// Transfer an encrypted amount to `to`.
        ///
        /// Succeeds even when the caller's balance is too low; in that case an encryption of
        /// zero is moved.
        #[pallet::call_index(2)]
        #[pallet::weight(T::DbWeight::get().reads_writes(3, 4))]
        pub fn transfer(
            origin: OriginFor<T>,
            asset: T::AssetId,
            to: T::AccountId,
            encrypted_amount: Handle,
            proof: Vec<u8>,
        ) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(Self::token_exists(asset), Error::<T>::UnknownToken);

            let amount = Self::verify_input(&asset, &who, encrypted_amount, &proof)?;
            Self::do_transfer(asset, &who, &to, amount)?;
            Ok(())
        }
    }

    impl<T: Config> Pallet<T> {
        pub fn token_exists(asset: T::AssetId) -> bool {
            Tokens::<T>::contains_key(asset)
        }

        /// Current balance handle, or [`ZERO_HANDLE`] if none was ever recorded.
        pub fn encrypted_balance_of(asset: T::AssetId, who: &T::AccountId) -> Handle {
            Balances::<T>::get(asset, who).unwrap_or(ZERO_HANDLE)
        }

        pub fn is_allowed(handle: Handle, who: &T::AccountId) -> bool {
            Acl::<T>::contains_key(handle, who)
        }

        /// Allow `who` to request disclosure of `handle`.
        pub fn allow(handle: Handle, who: &T::AccountId) {
            Acl::<T>::insert(handle, who, ());
        }

        /// Verify an encrypted input sent by `caller` to `target`.
        pub fn verify_input<Target: Encode>(
            target: &Target,
            caller: &T::AccountId,
            input: Handle,
            proof: &[u8],
        ) -> Result<Handle, DispatchError> {
            ensure!(proof.len() <= T::MaxProofLength::get() as usize, Error::<T>::ProofTooLong);
            let binding = input_binding(target, caller);
            T::Coprocessor::verify_input(input, proof, binding)
                .ok_or_else(|| Error::<T>::InvalidInputProof.into())
        }

        /// Add `amount` to `to`'s balance and to the total supply.
        pub fn do_mint(asset: T::AssetId, to: &T::AccountId, amount: Handle) -> DispatchResult {
            Tokens::<T>::try_mutate(asset, |details| -> DispatchResult {
                let details = details.as_mut().ok_or(Error::<T>::UnknownToken)?;
                details.total_supply = T::Coprocessor::add(details.total_supply, amount);
                Self::allow(details.total_supply, &details.owner);
                Ok(())
            })?;

            let balance = T::Coprocessor::add(Self::encrypted_balance_of(asset, to), amount);
            Self::write_balance(asset, to, balance);

            log::debug!(target: LOG_TARGET, "minted to {to:?}");
            Self::deposit_event(Event::Minted { asset, to: to.clone() });
            Ok(())
        }

        /// Move up to `amount` from `from` to `to`.
        ///
        /// Returns the handle of the amount actually moved: `amount` if `from` could cover it,
        /// an encryption of zero otherwise.
        pub fn do_transfer(
            asset: T::AssetId,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: Handle,
        ) -> Result<Handle, DispatchError> {
            ensure!(Self::token_exists(asset), Error::<T>::UnknownToken);

            let from_balance = Self::encrypted_balance_of(asset, from);
            let covered = T::Coprocessor::le(amount, from_balance);
            let moved = T::Coprocessor::select(covered, amount, T::Coprocessor::trivial_encrypt(0));

            Self::write_balance(asset, from, T::Coprocessor::sub(from_balance, moved));
            let to_balance = Self::encrypted_balance_of(asset, to);
            Self::write_balance(asset, to, T::Coprocessor::add(to_balance, moved));

            log::debug!(target: LOG_TARGET, "transfer {from:?} -> {to:?}");
            Self::deposit_event(Event::Transferred { asset, from: from.clone(), to: to.clone() });
            Ok(moved)
        }

        fn write_balance(asset: T::AssetId, who: &T::AccountId, balance: Handle) {
            Balances::<T>::insert(asset, who, balance);
            Self::allow(balance, who);
        }
    }
}
