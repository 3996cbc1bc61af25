//! Transaction submission for the airdrop lifecycle.
//!
//! Signing, submission and confirmation belong to an external gateway. [`DropClient`] builds
//! the calls, waits for the configured number of confirmations and maps dispatch failures to
//! [`DropError`] kinds.

use crate::{AssetId, CollectionId, TokenId, error::DropError, grant::TypedData};
use pallet_confidential_balances::Handle;
use pallet_invisible_drop::{AirdropId, EligibilityConditions};
use sp_core::H256;
use sp_runtime::MultiSignature;
use std::future::Future;
use thiserror::Error;

const LOG_TARGET: &str = "invisible-drop::gateway";

pub type TxHash = H256;

/// Signs typed data on behalf of the account that controls the balances.
pub trait TypedDataSigner {
    fn sign_typed_data(
        &self,
        data: &TypedData,
    ) -> impl Future<Output = Result<MultiSignature, GatewayError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropCall {
    CreateAirdrop {
        reward_asset: AssetId,
        reward_per_user: u64,
        end_time: u64,
        conditions: EligibilityConditions<CollectionId, TokenId>,
    },
    DepositRewards { airdrop_id: AirdropId, encrypted_amount: Handle, proof: Vec<u8> },
    ClaimReward { airdrop_id: AirdropId },
}

/// Events of interest found in a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropEvent {
    AirdropCreated { airdrop_id: AirdropId },
    RewardsDeposited { airdrop_id: AirdropId },
    RewardClaimed { airdrop_id: AirdropId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub events: Vec<DropEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The transaction was included and its dispatch failed.
    #[error("dispatch failed: {pallet}::{error}")]
    Dispatch { pallet: String, error: String },
    /// No confirmation within the gateway's deadline.
    #[error("timed out waiting for confirmation")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

pub trait ChainGateway {
    fn submit_transaction(
        &self,
        call: DropCall,
    ) -> impl Future<Output = Result<TxHash, GatewayError>> + Send;

    /// Only `GatewayError::Dispatch` says the transaction failed. Any other error leaves its
    /// outcome open.
    fn await_confirmation(
        &self,
        tx: TxHash,
        confirmations: u32,
    ) -> impl Future<Output = Result<Receipt, GatewayError>> + Send;
}

#[derive(Debug, Clone)]
pub struct DropClientConfig {
    /// Blocks on top of the inclusion block before a receipt counts as final.
    pub confirmations: u32,
}

impl Default for DropClientConfig {
    fn default() -> Self {
        Self { confirmations: 1 }
    }
}

pub struct DropClient<G> {
    gateway: G,
    config: DropClientConfig,
}

impl<G: ChainGateway> DropClient<G> {
    pub fn new(gateway: G, config: DropClientConfig) -> Self {
        Self { gateway, config }
    }

    /// Creates an airdrop and returns its id.
    pub async fn create_airdrop(
        &self,
        reward_asset: AssetId,
        reward_per_user: u64,
        end_time: u64,
        conditions: EligibilityConditions<CollectionId, TokenId>,
    ) -> Result<AirdropId, DropError> {
        let call = DropCall::CreateAirdrop { reward_asset, reward_per_user, end_time, conditions };
        let receipt = self.submit(call).await?;
        receipt
            .events
            .iter()
            .find_map(|event| match event {
                DropEvent::AirdropCreated { airdrop_id } => Some(*airdrop_id),
                _ => None,
            })
            .ok_or_else(|| DropError::TransactionFailed("receipt lacks AirdropCreated".into()))
    }

    pub async fn deposit_rewards(
        &self,
        airdrop_id: AirdropId,
        encrypted_amount: Handle,
        proof: Vec<u8>,
    ) -> Result<Receipt, DropError> {
        self.submit(DropCall::DepositRewards { airdrop_id, encrypted_amount, proof }).await
    }

    /// Claims the reward. `NotEligible` and `AlreadyClaimed` are the chain's verdict at
    /// execution time, which may differ from an earlier eligibility read.
    pub async fn claim_reward(&self, airdrop_id: AirdropId) -> Result<Receipt, DropError> {
        self.submit(DropCall::ClaimReward { airdrop_id }).await
    }

    async fn submit(&self, call: DropCall) -> Result<Receipt, DropError> {
        let tx = self.gateway.submit_transaction(call).await.map_err(|e| match e {
            GatewayError::Timeout => {
                log::info!(target: LOG_TARGET, "broadcast timed out");
                DropError::SubmissionUncertain
            },
            e => dispatch_error(e),
        })?;
        log::debug!(target: LOG_TARGET, "submitted {tx:?}");

        // Once broadcast, only a dispatch failure proves the call did not take effect.
        match self.gateway.await_confirmation(tx, self.config.confirmations).await {
            Ok(receipt) => Ok(receipt),
            Err(e @ GatewayError::Dispatch { .. }) => Err(dispatch_error(e)),
            Err(e) => {
                log::info!(target: LOG_TARGET, "{tx:?} still unconfirmed: {e}");
                Err(DropError::ConfirmationPending(tx))
            },
        }
    }
}

fn dispatch_error(e: GatewayError) -> DropError {
    match &e {
        GatewayError::Dispatch { pallet, error } => match (pallet.as_str(), error.as_str()) {
            ("InvisibleDrop", "InvalidParameters") |
            ("ConfidentialBalances", "InvalidInputProof" | "ProofTooLong") =>
                DropError::InvalidParameters,
            ("InvisibleDrop", "AirdropNotFound") => DropError::AirdropNotFound,
            ("InvisibleDrop", "NotEligible") => DropError::NotEligible,
            ("InvisibleDrop", "AlreadyClaimed") => DropError::AlreadyClaimed,
            _ => DropError::TransactionFailed(e.to_string()),
        },
        _ => DropError::TransactionFailed(e.to_string()),
    }
}
