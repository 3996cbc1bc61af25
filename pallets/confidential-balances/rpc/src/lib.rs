use codec::Codec;
use jsonrpsee::{
    core::{RpcResult, async_trait},
    proc_macros::rpc,
    types::error::{ErrorCode, ErrorObject},
};
use pallet_confidential_balances_rpc_api::ConfidentialBalancesApi;
use sp_api::ProvideRuntimeApi;
use sp_blockchain::HeaderBackend;
use sp_core::H256;
use sp_runtime::traits::Block as BlockT;
use std::sync::Arc;

// RPC trait definition using jsonrpsee
#[rpc(client, server)]
pub trait ConfidentialBalancesRpc<BlockHash, AccountId, AssetId> {
    /// Current balance handle of an account. All zeroes means nothing was ever recorded.
    #[method(name = "confidentialBalances_encryptedBalanceOf")]
    async fn encrypted_balance_of(
        &self,
        asset: AssetId,
        who: AccountId,
        at: Option<BlockHash>,
    ) -> RpcResult<H256>;

    /// Whether an account may request disclosure of a handle
    #[method(name = "confidentialBalances_isAllowed")]
    async fn is_allowed(
        &self,
        handle: H256,
        who: AccountId,
        at: Option<BlockHash>,
    ) -> RpcResult<bool>;
}

// RPC implementation
pub struct ConfidentialBalancesRpcImpl<C, Block> {
    client: Arc<C>,
    _marker: std::marker::PhantomData<Block>,
}

impl<C, Block> ConfidentialBalancesRpcImpl<C, Block> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, _marker: Default::default() }
    }
}

fn runtime_error(message: &'static str, e: impl ToString) -> ErrorObject<'static> {
    ErrorObject::owned(ErrorCode::InternalError.code(), message, Some(e.to_string()))
}

#[async_trait]
impl<C, Block, AccountId, AssetId> ConfidentialBalancesRpcServer<Block::Hash, AccountId, AssetId>
    for ConfidentialBalancesRpcImpl<C, Block>
where
    Block: BlockT,
    C: Send + Sync + 'static + ProvideRuntimeApi<Block> + HeaderBackend<Block>,
    C::Api: ConfidentialBalancesApi<Block, AccountId, AssetId>,
    AccountId: Clone + Codec + Send + Sync + 'static,
    AssetId: Clone + Codec + Send + Sync + 'static,
{
    async fn encrypted_balance_of(
        &self,
        asset: AssetId,
        who: AccountId,
        at: Option<Block::Hash>,
    ) -> RpcResult<H256> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.encrypted_balance_of(at_hash, asset, who)
            .map_err(|e| runtime_error("Failed to read encrypted balance", e))
    }

    async fn is_allowed(
        &self,
        handle: H256,
        who: AccountId,
        at: Option<Block::Hash>,
    ) -> RpcResult<bool> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.is_allowed(at_hash, handle, who)
            .map_err(|e| runtime_error("Failed to check handle access", e))
    }
}
