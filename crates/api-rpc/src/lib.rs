//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server for analysis jobs, cohorts and admin stats.
//! Every method takes the caller's `api_key` as a named parameter.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
