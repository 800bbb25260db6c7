//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over TCP (HTTP and WebSocket on the same port).

use crate::handler::RpcHandler;
use crate::types::{
    AnalyzeParams, ConfirmParams, PollParams, ProposeParams, ResultsParams, StatsParams,
    SubmitParams,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::RpcModule;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use signal_core::error::{AppError, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC Server Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Bind and start serving. Returns the bound address (port 0 picks a free one).
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to build server on {}: {}", addr, e)))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let module = self.module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }

    fn module(&self) -> Result<RpcModule<()>> {
        let mut module = RpcModule::new(());
        let h = &self.handler;

        register(&mut module, "analysis.submit.v1", h, |h, p: SubmitParams| async move {
            h.submit(p).await
        })?;
        register(&mut module, "analysis.poll.v1", h, |h, p: PollParams| async move {
            h.poll(p).await
        })?;
        register(&mut module, "cohort.propose.v1", h, |h, p: ProposeParams| async move {
            h.propose(p).await
        })?;
        register(&mut module, "cohort.confirm.v1", h, |h, p: ConfirmParams| async move {
            h.confirm(p).await
        })?;
        register(&mut module, "cohort.analyze.v1", h, |h, p: AnalyzeParams| async move {
            h.analyze(p).await
        })?;
        register(&mut module, "cohort.results.v1", h, |h, p: ResultsParams| async move {
            h.results(p).await
        })?;
        register(&mut module, "admin.stats.v1", h, |h, p: StatsParams| async move {
            h.stats(p).await
        })?;

        Ok(module)
    }
}

/// Register one method taking named params `P` and returning `R`
fn register<P, R, F, Fut>(
    module: &mut RpcModule<()>,
    method: &'static str,
    handler: &Arc<RpcHandler>,
    call: F,
) -> Result<()>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Clone + Send + 'static,
    F: Fn(Arc<RpcHandler>, P) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, ErrorObjectOwned>> + Send + 'static,
{
    let handler = handler.clone();
    module
        .register_async_method(method, move |params, _, _| {
            let handler = handler.clone();
            let call = call.clone();
            async move {
                let request: P = params.parse()?;
                call(handler, request).await
            }
        })
        .map_err(|e| AppError::Internal(format!("Failed to register {}: {}", method, e)))?;
    Ok(())
}
