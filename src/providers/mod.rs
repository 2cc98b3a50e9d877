//! Providers Module - External Data Sources
//!
//! JSON-RPC node, Alchemy transfers API and block explorer, joined behind
//! the `ChainDataSource` trait.

pub mod alchemy;
pub mod chain;
pub mod explorer;
pub mod rpc;
pub mod sources;

pub use chain::LiveChainData;
pub use sources::*;
