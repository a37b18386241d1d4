//! Server-wide constants
//!
//! Single source of truth for defaults and file layout.

/// Network configuration
pub mod network {
    /// Default host for local binding
    pub const HOST: &str = "127.0.0.1";
    /// Default listening port
    pub const PORT: u16 = 8080;
}

/// Environment variable names
pub mod env {
    pub const DATA_DIR: &str = "FLOW_SERVER_DATA_DIR";
    pub const HOST: &str = "FLOW_SERVER_HOST";
    pub const PORT: &str = "FLOW_SERVER_PORT";
}

/// Data storage paths, relative to the data directory
pub mod paths {
    /// Default data directory
    pub const DATA_DIR: &str = "data";
    /// One JSON file per stored flow
    pub const PROCESS_FLOWS_DIR: &str = "process-flows";
    /// Server configuration file
    pub const CONFIG_FILE: &str = "flow-server.json";
}
