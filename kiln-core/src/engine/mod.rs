//! 按需求值的属性引擎
//!
//! - [`Cell`]: 单个属性值的缓存容器
//! - [`Unit`]: 填充 Cell 的受跟踪计算
//! - [`Scheduler`] / [`Evaluator`]: 运行单元、缓存结果、从循环中恢复
//! - [`Phase`]: 并发求值的轮次
//! - [`WorkerPool`]: 共享同一调度器的 scoped 工作线程

pub mod cell;
pub mod error;
pub mod phase;
pub mod pool;
pub mod scheduler;
pub mod unit;

pub use cell::{Cell, CellData, CellValue, Handler, Probe};
pub use error::EngineError;
pub use pool::{PoolReport, WorkerPool};
pub use scheduler::{Attempt, Evaluator, Scheduler};
pub use unit::{Phase, Status, Unit, UnitBody, UnitId};
