pub mod executor;
pub mod http;
pub mod probe;
pub mod rpc;
pub mod types;

pub use executor::{ExecutorConfig, RpcExecutor};
pub use http::HttpTransport;
pub use probe::{EndpointProbe, ProbeReport, ProbeStatus};
pub use rpc::SolanaRpcClient;
