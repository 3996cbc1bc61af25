use codec::Codec;
use jsonrpsee::{
    core::{RpcResult, async_trait},
    proc_macros::rpc,
    types::error::{ErrorCode, ErrorObject},
};
use pallet_invisible_drop::{AirdropId, ClaimRecord};
use pallet_invisible_drop_rpc_api::{AirdropViewOf, InvisibleDropApi};
use sp_api::ProvideRuntimeApi;
use sp_blockchain::HeaderBackend;
use sp_runtime::traits::Block as BlockT;
use std::sync::Arc;

// Airdrop structure for RPC responses
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropDetails<AccountId, AssetId, CollectionId, TokenId> {
    pub creator: AccountId,
    pub reward_asset: AssetId,
    pub reward_per_user: u64,
    pub end_time: u64,
    pub is_active: bool,
    pub required_nft: Option<CollectionId>,
    pub required_token: Option<TokenId>,
    /// `0` when no token is required.
    pub min_token_amount: u128,
}

impl<AccountId, AssetId, CollectionId, TokenId>
    From<AirdropViewOf<AccountId, AssetId, CollectionId, TokenId>>
    for AirdropDetails<AccountId, AssetId, CollectionId, TokenId>
{
    fn from(view: AirdropViewOf<AccountId, AssetId, CollectionId, TokenId>) -> Self {
        let conditions = view.info.conditions;
        let (required_token, min_token_amount) = match conditions.token {
            Some(threshold) => (Some(threshold.token), threshold.min_amount),
            None => (None, 0),
        };
        Self {
            creator: view.info.creator,
            reward_asset: view.info.reward_asset,
            reward_per_user: view.info.reward_per_user,
            end_time: view.info.end_time,
            is_active: view.is_active,
            required_nft: conditions.nft,
            required_token,
            min_token_amount,
        }
    }
}

// Claim state for RPC responses
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInfo {
    pub has_claimed: bool,
    pub claim_time: u64,
}

impl From<ClaimRecord> for ClaimInfo {
    fn from(record: ClaimRecord) -> Self {
        Self { has_claimed: record.has_claimed, claim_time: record.claim_time }
    }
}

// RPC trait definition using jsonrpsee
#[rpc(client, server)]
pub trait InvisibleDropRpc<BlockHash, AccountId, AssetId, CollectionId, TokenId> {
    /// Whether an account could claim an airdrop right now. Advisory only.
    #[method(name = "invisibleDrop_checkEligibility")]
    async fn check_eligibility(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<BlockHash>,
    ) -> RpcResult<bool>;

    /// Reward an account would receive by claiming now
    #[method(name = "invisibleDrop_checkClaimableAmount")]
    async fn check_claimable_amount(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<BlockHash>,
    ) -> RpcResult<u64>;

    #[method(name = "invisibleDrop_airdropInfo")]
    async fn airdrop_info(
        &self,
        airdrop_id: AirdropId,
        at: Option<BlockHash>,
    ) -> RpcResult<Option<AirdropDetails<AccountId, AssetId, CollectionId, TokenId>>>;

    #[method(name = "invisibleDrop_claimInfo")]
    async fn claim_info(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<BlockHash>,
    ) -> RpcResult<ClaimInfo>;

    /// Number of airdrops created so far
    #[method(name = "invisibleDrop_airdropCount")]
    async fn airdrop_count(&self, at: Option<BlockHash>) -> RpcResult<AirdropId>;
}

// RPC implementation
pub struct InvisibleDropRpcImpl<C, Block> {
    client: Arc<C>,
    _marker: std::marker::PhantomData<Block>,
}

impl<C, Block> InvisibleDropRpcImpl<C, Block> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client, _marker: Default::default() }
    }
}

fn runtime_error(message: &'static str, e: impl ToString) -> ErrorObject<'static> {
    ErrorObject::owned(ErrorCode::InternalError.code(), message, Some(e.to_string()))
}

#[async_trait]
impl<C, Block, AccountId, AssetId, CollectionId, TokenId>
    InvisibleDropRpcServer<Block::Hash, AccountId, AssetId, CollectionId, TokenId>
    for InvisibleDropRpcImpl<C, Block>
where
    Block: BlockT,
    C: Send + Sync + 'static + ProvideRuntimeApi<Block> + HeaderBackend<Block>,
    C::Api: InvisibleDropApi<Block, AccountId, AssetId, CollectionId, TokenId>,
    AccountId: Clone + Codec + Send + Sync + 'static,
    AssetId: Clone + Codec + Send + Sync + 'static,
    CollectionId: Clone + Codec + Send + Sync + 'static,
    TokenId: Clone + Codec + Send + Sync + 'static,
{
    async fn check_eligibility(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<Block::Hash>,
    ) -> RpcResult<bool> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.check_eligibility(at_hash, airdrop_id, who)
            .map_err(|e| runtime_error("Failed to check airdrop eligibility", e))
    }

    async fn check_claimable_amount(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<Block::Hash>,
    ) -> RpcResult<u64> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.check_claimable_amount(at_hash, airdrop_id, who)
            .map_err(|e| runtime_error("Failed to get claimable amount", e))
    }

    async fn airdrop_info(
        &self,
        airdrop_id: AirdropId,
        at: Option<Block::Hash>,
    ) -> RpcResult<Option<AirdropDetails<AccountId, AssetId, CollectionId, TokenId>>> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        let view = api
            .airdrop_info(at_hash, airdrop_id)
            .map_err(|e| runtime_error("Failed to get airdrop info", e))?;
        Ok(view.map(Into::into))
    }

    async fn claim_info(
        &self,
        airdrop_id: AirdropId,
        who: AccountId,
        at: Option<Block::Hash>,
    ) -> RpcResult<ClaimInfo> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.claim_info(at_hash, airdrop_id, who)
            .map(Into::into)
            .map_err(|e| runtime_error("Failed to get claim info", e))
    }

    async fn airdrop_count(&self, at: Option<Block::Hash>) -> RpcResult<AirdropId> {
        let api = self.client.runtime_api();
        let at_hash = at.unwrap_or_else(|| self.client.info().best_hash);

        api.airdrop_count(at_hash).map_err(|e| runtime_error("Failed to get airdrop count", e))
    }
}
