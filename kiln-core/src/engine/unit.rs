//! 计算单元及其生命周期状态

use std::fmt;
use std::sync::{Arc, Weak};

use crate::engine::error::EngineError;
use crate::engine::scheduler::{Evaluator, Shared};

/// 单元标识，在同一调度器内唯一
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// 逻辑求值轮次
///
/// 在所有更低阶段的已登记单元到达终态之前，阶段 `k` 的单元不会开始。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Phase(pub u32);

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 单元的生命周期
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    New,
    Running,
    /// 在同一个栈上被自己的函数体重入
    RunningRecursive,
    /// 已报告失败，单元将以 `Fail` 结束
    RunningWillFail,
    Success,
    Fail,
}

impl Status {
    /// 单元是否已最终结束
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Fail)
    }

    /// 是否有求值器的栈上正有这个单元
    pub fn is_running(self) -> bool {
        matches!(
            self,
            Status::Running | Status::RunningRecursive | Status::RunningWillFail
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Running => "running",
            Status::RunningRecursive => "running-recursive",
            Status::RunningWillFail => "running-will-fail",
            Status::Success => "success",
            Status::Fail => "fail",
        }
    }
}

/// 单元的函数体
///
/// 通过求值器读取其他 Cell，用 [`Evaluator::fill`] 填充自己的 Cell。
pub type UnitBody = Arc<dyn Fn(&mut Evaluator<'_>) -> Result<(), EngineError> + Send + Sync>;

/// 填充一个或多个 Cell 的受跟踪计算
///
/// 单元由 [`Scheduler::unit`](crate::engine::Scheduler::unit) 创建，之后不再
/// 修改；状态保存在调度器中。
pub struct Unit {
    id: UnitId,
    label: String,
    phase: Option<Phase>,
    body: UnitBody,
    owner: Weak<Shared>,
}

impl Unit {
    pub(crate) fn new(
        id: UnitId,
        label: String,
        phase: Option<Phase>,
        body: UnitBody,
        owner: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            label,
            phase,
            body,
            owner,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub(crate) fn run(&self, ev: &mut Evaluator<'_>) -> Result<(), EngineError> {
        (self.body)(ev)
    }

    /// 函数体、标签、阶段都相同的新单元
    ///
    /// 所属调度器已销毁时返回 `None`。
    pub(crate) fn renew(&self) -> Option<Arc<Unit>> {
        let shared = self.owner.upgrade()?;
        Some(Shared::register(
            &shared,
            self.label.clone(),
            self.phase,
            self.body.clone(),
        ))
    }

    /// 在所属调度器中的当前状态
    pub fn status(&self) -> Option<Status> {
        self.owner.upgrade().and_then(|shared| shared.status(self.id))
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(Status::Success.is_terminal());
        assert!(Status::Fail.is_terminal());
        assert!(!Status::RunningWillFail.is_terminal());
        assert!(Status::RunningRecursive.is_running());
        assert!(!Status::New.is_running());
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase(0) < Phase(1));
        assert_eq!(Phase(3).to_string(), "3");
        assert_eq!(UnitId(7).to_string(), "u7");
    }
}
