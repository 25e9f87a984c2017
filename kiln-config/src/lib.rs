//! Kiln Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! A configuration value is built by the driver and handed to a session
//! explicitly; nothing in the workspace reads configuration from a singleton.

use std::time::Duration;
use tracing::Level;

/// Complete configuration for one evaluation session
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Evaluation limits
    pub limits: LimitConfig,
    /// Worker pool sizing
    pub pool: PoolConfig,
    /// Per-component log levels
    pub log: LogConfig,
}

/// Limits applied by the scheduler while forcing cells
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Maximum number of units on one evaluator's active stack
    pub max_depth: usize,
    /// How long a blocked evaluator waits before logging a stall warning
    pub stall_warning: Duration,
}

/// Configuration for the bounded worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Stack size of each worker thread in bytes
    pub stack_size: usize,
}

/// Engine components that log under their own target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Cell,
    Scheduler,
    Phase,
    Pool,
    Equations,
}

/// Log configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level for every target
    pub global: Level,
    /// Cell level (None means use global)
    pub cell: Option<Level>,
    /// Scheduler level
    pub scheduler: Option<Level>,
    /// Phase barrier level
    pub phase: Option<Level>,
    /// Worker pool level
    pub pool: Option<Level>,
    /// Equation library level
    pub equations: Option<Level>,
}

impl Component {
    /// All components, in dependency order
    pub const ALL: [Component; 5] = [
        Component::Cell,
        Component::Scheduler,
        Component::Phase,
        Component::Pool,
        Component::Equations,
    ];

    /// Get the string name of the component
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Cell => "cell",
            Component::Scheduler => "scheduler",
            Component::Phase => "phase",
            Component::Pool => "pool",
            Component::Equations => "equations",
        }
    }

    /// Get the log target of the component
    pub fn target(&self) -> &'static str {
        match self {
            Component::Cell => "kiln::cell",
            Component::Scheduler => "kiln::scheduler",
            Component::Phase => "kiln::phase",
            Component::Pool => "kiln::pool",
            Component::Equations => "kiln::equations",
        }
    }
}

impl LogConfig {
    /// Effective level of a component
    ///
    /// Falls back to the global level when the component has no override.
    pub fn level_for(&self, component: Component) -> Level {
        let specific = match component {
            Component::Cell => self.cell,
            Component::Scheduler => self.scheduler,
            Component::Phase => self.phase,
            Component::Pool => self.pool,
            Component::Equations => self.equations,
        };
        specific.unwrap_or(self.global)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::INFO,
            cell: None,
            scheduler: None,
            phase: None,
            pool: None,
            equations: None,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            stall_warning: Duration::from_secs(2),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            stack_size: 8 * 1024 * 1024,
        }
    }
}
