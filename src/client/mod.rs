//! Client side: a cookie-keeping RPC client and the observable auth store
//! built on it.

pub mod auth_store;
pub mod rpc_client;

pub use auth_store::{AuthState, AuthStore, LogoutResult};
pub use rpc_client::{ClientError, RpcClient};
