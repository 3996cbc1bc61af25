//! Eligibility rules of an airdrop.
//!
//! An airdrop's conditions are a conjunction of independent holding predicates. Each predicate
//! only reads public holdings through [`HoldingsInspect`] and has no side effects, so the
//! result does not depend on the order in which predicates are evaluated.

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use frame_support::RuntimeDebug;
use scale_info::TypeInfo;

/// Read access to the public holdings the predicates are evaluated against.
pub trait HoldingsInspect<AccountId, CollectionId, TokenId> {
    /// Number of items of `collection` owned by `who`.
    fn nft_count(collection: &CollectionId, who: &AccountId) -> u32;

    /// Balance of the public fungible `token` held by `who`.
    fn token_balance(token: &TokenId, who: &AccountId) -> u128;
}

/// Minimum balance of a public fungible token.
#[derive(
    Encode, Decode, DecodeWithMemTracking, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen,
)]
pub struct TokenThreshold<TokenId> {
    pub token: TokenId,
    pub min_amount: u128,
}

/// The conditions an address must meet to claim. Fixed when the airdrop is created.
///
/// `nft` set means "requires at least one item of the collection"; `token` set means "requires
/// at least `min_amount` of the token". With neither set the airdrop is open to everyone.
#[derive(
    Encode, Decode, DecodeWithMemTracking, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen,
)]
pub struct EligibilityConditions<CollectionId, TokenId> {
    pub nft: Option<CollectionId>,
    pub token: Option<TokenThreshold<TokenId>>,
}

impl<CollectionId, TokenId> Default for EligibilityConditions<CollectionId, TokenId> {
    fn default() -> Self {
        Self { nft: None, token: None }
    }
}

/// One independently checkable requirement.
#[derive(Clone, Copy, PartialEq, Eq, RuntimeDebug)]
pub enum Predicate<'a, CollectionId, TokenId> {
    HoldsNft(&'a CollectionId),
    HoldsToken(&'a TokenThreshold<TokenId>),
}

impl<CollectionId, TokenId> Predicate<'_, CollectionId, TokenId> {
    pub fn holds<AccountId, H>(&self, who: &AccountId) -> bool
    where
        H: HoldingsInspect<AccountId, CollectionId, TokenId>,
    {
        match self {
            Predicate::HoldsNft(collection) => H::nft_count(collection, who) > 0,
            Predicate::HoldsToken(threshold) =>
                H::token_balance(&threshold.token, who) >= threshold.min_amount,
        }
    }
}

impl<CollectionId, TokenId> EligibilityConditions<CollectionId, TokenId> {
    /// True when no predicate is set.
    pub fn is_open(&self) -> bool {
        self.nft.is_none() && self.token.is_none()
    }

    /// The predicates this set of conditions is made of.
    pub fn predicates(&self) -> impl Iterator<Item = Predicate<'_, CollectionId, TokenId>> {
        self.nft
            .iter()
            .map(Predicate::HoldsNft)
            .chain(self.token.iter().map(Predicate::HoldsToken))
    }

    /// Whether `who` satisfies every predicate.
    pub fn evaluate<AccountId, H>(&self, who: &AccountId) -> bool
    where
        H: HoldingsInspect<AccountId, CollectionId, TokenId>,
    {
        self.predicates().all(|predicate| predicate.holds::<AccountId, H>(who))
    }
}
