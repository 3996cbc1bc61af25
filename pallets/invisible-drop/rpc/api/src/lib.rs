#![cfg_attr(not(feature = "std"), no_std)]
use codec::Codec;
use pallet_invisible_drop::{AirdropId, AirdropInfo, AirdropView, ClaimRecord, EligibilityConditions};

/// Airdrop as returned by [`InvisibleDropApi::airdrop_info`].
pub type AirdropViewOf<AccountId, AssetId, CollectionId, TokenId> =
    AirdropView<AirdropInfo<AccountId, AssetId, EligibilityConditions<CollectionId, TokenId>>>;

// Runtime API trait that needs to be implemented in the runtime
sp_api::decl_runtime_apis! {
    pub trait InvisibleDropApi<AccountId, AssetId, CollectionId, TokenId> where
        AccountId: Codec,
        AssetId: Codec,
        CollectionId: Codec,
        TokenId: Codec,
    {
        /// Whether `who` could claim `airdrop_id` at the queried block
        fn check_eligibility(airdrop_id: AirdropId, who: AccountId) -> bool;

        /// Reward `who` would receive by claiming now, `0` if not eligible
        fn check_claimable_amount(airdrop_id: AirdropId, who: AccountId) -> u64;

        /// Terms, conditions and activity of an airdrop
        fn airdrop_info(airdrop_id: AirdropId) -> Option<AirdropViewOf<AccountId, AssetId, CollectionId, TokenId>>;

        /// Claim state of `who` in `airdrop_id`
        fn claim_info(airdrop_id: AirdropId, who: AccountId) -> ClaimRecord;

        /// Number of airdrops created so far
        fn airdrop_count() -> AirdropId;
    }
}
