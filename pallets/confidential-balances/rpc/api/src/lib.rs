#![cfg_attr(not(feature = "std"), no_std)]
use codec::Codec;
use sp_core::H256;

// Runtime API trait that needs to be implemented in the runtime
sp_api::decl_runtime_apis! {
    pub trait ConfidentialBalancesApi<AccountId, AssetId> where
        AccountId: Codec,
        AssetId: Codec,
    {
        /// Current balance handle of `who`; all zeroes if nothing was ever recorded
        fn encrypted_balance_of(asset: AssetId, who: AccountId) -> H256;

        /// Whether `who` may request disclosure of `handle`
        fn is_allowed(handle: H256, who: AccountId) -> bool;
    }
}
