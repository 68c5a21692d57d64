//! Domain Layer - Core logic for buyer discovery
//!
//! Pure types and policies with no network access. All RPC traffic happens
//! through the ports layer.
//!
//! - `address`: token address validation and the user-wallet classifier
//! - `known_programs`: system programs and sysvars never treated as buyers
//! - `endpoint`: endpoint pool with rotation and a TTL blacklist
//! - `pacing`: wait policy per endpoint tier and attempt
//! - `budget`: per-tier sampling limits and the per-run scan plan
//! - `observation`: wallet observations, token metadata and the result ordering

pub mod address;
pub mod budget;
pub mod endpoint;
pub mod known_programs;
pub mod observation;
pub mod pacing;

pub use address::{is_user_wallet, is_valid_token_address};
pub use budget::{ScanPlan, TierBudget};
pub use endpoint::{Endpoint, EndpointPool, EndpointPoolError, EndpointTier, BLACKLIST_TTL};
pub use known_programs::{is_system_program, SYSTEM_PROGRAMS};
pub use observation::{
    sort_observations, BlockTime, DiscoveryResult, DiscoveryStats, DiscoveryStatus,
    SignatureRecord, SortKey, TokenMeta, WalletObservation,
};
pub use pacing::{stage_pause, wait_before, PacingConfig, Stage};
