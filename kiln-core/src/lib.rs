//! Kiln Core - 按需求值的属性引擎
//!
//! 程序树的静态性质（可达性、正常完成、跳转逃逸集、异常集、常量值）
//! 彼此递归依赖。Kiln 惰性地计算它们：每个 (节点, 属性) 对应一个带缓存的
//! Cell，由一个受跟踪的计算单元填充；遇到循环依赖时使用声明的回退值，
//! 失败只报告一次并以哨兵值代替。
//!
//! # 架构
//!
//! ```text
//! src/
//! ├── engine/     - Cell、Unit、调度器、阶段屏障、工作线程池
//! ├── tree/       - 程序树 arena 与语法降级
//! ├── equations/  - 树上的各类属性方程
//! ├── rules.rs    - 规则提供者（抛出的异常、子类型关系）
//! ├── sets.rs     - 紧凑的逃逸集与异常集
//! └── session.rs  - 一次运行的配置、调度器与报告器
//! ```
//!
//! # 快速开始
//!
//! ```ignore
//! use std::sync::Arc;
//! use kiln_core::{Analysis, Session, StaticRules, Stmt, TreeBuilder};
//!
//! let session = Session::default();
//! let tree = TreeBuilder::build(&Stmt::block(vec![Stmt::ret(), Stmt::call("print")]));
//! let analysis = Analysis::new(&session, Arc::new(tree), Arc::new(StaticRules::new()));
//! analysis.diagnose(&mut session.evaluator())?;
//! ```

pub mod diagnostics;
pub mod engine;
pub mod equations;
pub mod logger;
pub mod rules;
pub mod session;
pub mod sets;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticBuffer, DiagnosticKind, Location, Reporter};
pub use engine::{
    Attempt, Cell, CellValue, EngineError, Evaluator, Phase, PoolReport, Probe, Scheduler,
    Status, Unit, UnitId, WorkerPool,
};
pub use equations::{
    Analysis, AttrKind, Attribute, Breaks, Completes, Const, Constant, Continues, Propagated,
    Raised, Reachable, UnreachableRun,
};
pub use logger::{init_logger, LogFormat};
pub use rules::{RuleProvider, StaticRules, Violation};
pub use session::Session;
pub use sets::{ExcType, JumpLabel, LabelSet, PackedSet, TypeSet};
pub use tree::{Case, Expr, NodeId, NodeKind, Stmt, Tree, TreeBuilder};

pub use kiln_config::{Component, EngineConfig, LimitConfig, LogConfig, PoolConfig};
