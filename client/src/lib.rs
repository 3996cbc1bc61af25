//! Off-chain side of invisible drops.
//!
//! - [`handshake::Discloser`] recovers the plaintext of an owner's confidential balance through
//!   a decryption oracle, using a fresh session key and a short-lived signed grant per call.
//! - [`oracle::GrantVerifyingOracle`] is the oracle-side check of such grants.
//! - [`gateway::DropClient`] submits the airdrop transactions and reports their outcome.
//!
//! Transport, signing wallets and the ledger itself are supplied through the traits in
//! [`store`], [`oracle`] and [`gateway`].

#[cfg(test)]
mod mock;
#[cfg(test)]
mod mock_runtime;

pub mod error;
pub mod gateway;
pub mod grant;
pub mod handshake;
pub mod oracle;
pub mod store;

pub use error::{DisclosureError, DropError, StoreError};
pub use gateway::{ChainGateway, DropCall, DropClient, DropClientConfig, Receipt, TypedDataSigner};
pub use handshake::{DisclosureConfig, Discloser};
pub use oracle::{DecryptionOracle, DisclosedValue, GrantVerifyingOracle, OracleBackend};
pub use store::EncryptedBalanceStore;

/// Confidential token identifier, as used by the runtime.
pub type AssetId = u32;
pub type CollectionId = u32;
pub type TokenId = u32;
