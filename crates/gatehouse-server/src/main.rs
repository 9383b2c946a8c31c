// crates/gatehouse-server/src/main.rs
// ============================================================================
// Module: Gatehouse Binary
// Description: Process entry point for the Gatehouse gateway.
// Purpose: Load configuration and serve the gateway until shutdown.
// Dependencies: gatehouse-config, gatehouse-server, tokio
// ============================================================================

//! Gatehouse gateway binary.
//!
//! The config path comes from the first CLI argument when present, otherwise
//! from the `GATEHOUSE_CONFIG` environment variable or the default file name.

use std::path::PathBuf;

use gatehouse_config::GatewayConfig;
use gatehouse_server::GatewayServer;
use gatehouse_server::GatewayServerError;

#[tokio::main]
async fn main() -> Result<(), GatewayServerError> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = GatewayConfig::load(path.as_deref())
        .map_err(|err| GatewayServerError::Config(err.to_string()))?;
    let server = GatewayServer::from_config(config)?;
    server.serve().await
}
