//! Rendering error types

use thiserror::Error;

/// Rendering errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Load balancer '{load_balancer}' referenced by {referenced_by} is not defined")]
    UnknownLoadBalancer {
        load_balancer: String,
        referenced_by: String,
    },

    #[error("Network '{network}' referenced by load balancer '{load_balancer}' is not defined")]
    UnknownNetwork {
        network: String,
        load_balancer: String,
    },

    #[error("Subnet allocation failed for network '{network}': {message}")]
    SubnetAllocation { network: String, message: String },

    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("Resource '{from}' references unknown resource '{to}'")]
    DanglingReference { from: String, to: String },

    #[error("Circular dependency between resources: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("Unknown output format: {0} (expected json or yaml)")]
    UnknownFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
