//! 引擎错误类型
//!
//! 只有违反不变量才算错误。循环在引擎内部恢复，解析失败则通过会话的
//! [`Reporter`](crate::diagnostics::Reporter) 报告。

use thiserror::Error;

use crate::engine::unit::{Phase, UnitId};
use crate::tree::NodeId;

/// 致命的引擎错误
///
/// 任何一种都会中止当前编译单元的求值。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("cell `{cell}` has no resolver and no cached value")]
    MissingResolver { cell: String },

    #[error("unit `{unit}` finished without filling cell `{cell}`")]
    Unfilled { cell: String, unit: String },

    #[error("attribute `{attribute}` on node {node} is stored with a different value type")]
    AttributeTypeMismatch { attribute: &'static str, node: NodeId },

    #[error("evaluation depth limit {limit} exceeded while entering unit `{unit}`")]
    DepthExceeded { unit: String, limit: usize },

    #[error("unit `{unit}` of phase {phase} depends on `{blocker}` of earlier phase {blocker_phase} which is still on the stack")]
    PhaseOrder {
        unit: String,
        phase: Phase,
        blocker: String,
        blocker_phase: Phase,
    },

    #[error("unit {0} is not registered with this scheduler")]
    UnknownUnit(UnitId),

    #[error("node {0} does not exist in the tree")]
    UnknownNode(NodeId),

    #[error("analysis was dropped while unit `{0}` was still pending")]
    Detached(String),

    #[error("worker `{0}` panicked")]
    WorkerPanicked(String),
}
