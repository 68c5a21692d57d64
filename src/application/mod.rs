pub mod balance;
pub mod discovery;
pub mod scout;

pub use balance::balance_of;
pub use discovery::{BuyerDiscovery, DiscoveryConfig};
pub use scout::{BuyerScout, CommonBuyers, CommonBuyersError, TokenBuyers, MAX_COMMON_TOKENS, MIN_COMMON_TOKENS};
