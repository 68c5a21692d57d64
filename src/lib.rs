//! Buyer Scout - Early-buyer discovery for Solana tokens
//!
//! Samples the largest holder accounts of a mint, walks their oldest
//! transactions and returns the user wallets involved, in a deterministic
//! order, over a pool of rotating and rate-limit-aware RPC endpoints.
//!
//! # Modules
//!
//! - `domain`: Core logic (address classifier, endpoint pool, pacing, scan budget, ordering)
//! - `ports`: Trait abstractions (RpcTransport, ChainReader, TokenInfoSource) and test doubles
//! - `adapters`: External implementations (HTTP transport, RPC executor, Solana client, Jupiter, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Discovery pipeline and the BuyerScout facade

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
