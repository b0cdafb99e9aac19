// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors from `config::load_and_validate_config`: either the YAML failed to
/// parse, or it parsed but described an invalid domain configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config as YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("worker_count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    #[error("engine kind '{0}' is not one of: sequential, parallel")]
    UnknownEngineKind(String),
}
