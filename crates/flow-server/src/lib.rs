//! Flow Server - HTTP host for process flows
//!
//! Serves the flow store and business-flow directory from `process-designer`
//! over a small JSON API. Data lives in flat files under the data directory:
//!
//! - `process-flows/<flow id>.json`: one stored flow each
//! - `businessFlow.json`: the business-flow tree
//! - `designer.json`: layout and viewport configuration
//! - `flow-server.json`: bind host and port

pub mod api;
pub mod config;
pub mod constants;
pub mod error;

pub use api::{router, AppState};
pub use config::ServerConfig;
pub use error::{ApiError, ServerError};

use process_designer::{BusinessFlowDirectory, DesignerConfig, FlowStore};

/// Load everything under the configured data directory
pub async fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let designer = DesignerConfig::load(&config.data_dir).await?;

    let mut store = FlowStore::with_persistence(config.flows_dir());
    let count = store.load_from_disk().await?;
    log::info!("Loaded {} process flows from {:?}", count, config.flows_dir());

    Ok(AppState::new(
        store.into_shared(),
        BusinessFlowDirectory::in_dir(&config.data_dir),
        designer,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use process_designer::{FlowDocument, FlowMetadata, IdGenerator, ProcessGraph, ProcessType};

    #[tokio::test]
    async fn test_build_state_loads_existing_flows() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(dir.path()).await.unwrap();

        {
            let mut store = FlowStore::with_persistence(config.flows_dir());
            store
                .create(FlowDocument::new(
                    ProcessGraph::initial(&IdGenerator::new()),
                    FlowMetadata::new("已存流程", ProcessType::Project),
                ))
                .await
                .unwrap();
        }

        let state = build_state(&config).await.unwrap();
        assert_eq!(state.store.read().await.len(), 1);
        assert_eq!(state.designer.history_limit, 100);
    }
}
