// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Domain configuration: the knobs from spec §6, loadable either
//! programmatically or from a YAML file via [`load_and_validate_config`] —
//! the same parse-then-validate two-step the teacher's own config loader
//! uses.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Which engine implementation a domain uses to drive propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Sequential,
    Parallel,
}

/// How an `Async`-mode transaction combines with another transaction
/// submitted while the first is still committing (spec's Open Question 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Run as two sequential commits, FIFO order. The spec's own
    /// recommended default.
    #[default]
    None,
    /// Coalesce adjacent pending transactions' staged changes into a single
    /// commit when they arrive before the previous commit has started.
    Adjacent,
}

/// Which comparator change detection uses when deciding if a recomputed
/// value counts as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EqualityPolicy {
    #[default]
    Default,
    User,
}

/// The configuration table from spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub engine: EngineKind,
    pub worker_count: Option<usize>,
    pub merge_policy: MergePolicy,
    pub equality: EqualityPolicy,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Sequential,
            worker_count: None,
            merge_policy: MergePolicy::None,
            equality: EqualityPolicy::Default,
        }
    }
}

impl DomainConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel() -> Self {
        Self {
            engine: EngineKind::Parallel,
            ..Self::default()
        }
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.worker_count {
            return Err(ConfigError::InvalidWorkerCount(0));
        }
        Ok(())
    }

    /// Number of worker tasks the parallel engine should spawn: the
    /// configured `worker_count`, or the host's available parallelism,
    /// matching the teacher's own fallback expression.
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Parse a YAML file into a [`DomainConfig`] and validate it, mirroring the
/// teacher's `load_and_validate_config(path)` shape.
pub fn load_and_validate_config(path: impl AsRef<Path>) -> Result<DomainConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: DomainConfig = serde_yaml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
