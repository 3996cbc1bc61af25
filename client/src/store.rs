use crate::{AssetId, error::StoreError};
use pallet_confidential_balances::Handle;
use sp_runtime::AccountId32;
use std::future::Future;

/// Read side of the confidential balance ledger.
pub trait EncryptedBalanceStore {
    /// Current balance handle of `owner`, the zero handle if none was ever recorded.
    fn encrypted_handle(
        &self,
        asset: AssetId,
        owner: &AccountId32,
    ) -> impl Future<Output = Result<Handle, StoreError>> + Send;
}
