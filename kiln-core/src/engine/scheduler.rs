//! 调度器与每线程求值器
//!
//! 调度器持有会话内所有求值器共享的状态表。[`Evaluator`] 是单个线程求值
//! Cell 的句柄，携带该线程正在运行的单元栈，循环检测就靠这个栈，不需要
//! 线程局部状态。
//!
//! 循环恢复以栈帧为单位。单元被重入时，它上方的每一帧都被标记为重入单元
//! （循环头）的下标。被标记的帧是临时的：结束时它填充的值降级为临时值，
//! 单元回到 `New`，之后在循环外求值时会重新计算。循环头本身正常结束。
//!
//! 循环也可能跨越多个求值器：每个求值器运行其中一段，并等待另一个正在运行
//! 的单元。阻塞之前，求值器沿状态表中的等待链查找；如果链条回到自己栈上的
//! 某个单元，就把该单元当作循环头，而不是继续等待。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kiln_config::LimitConfig;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::diagnostics::{DiagnosticKind, Location, Reporter};
use crate::engine::cell::{Cell, CellData, Slot};
use crate::engine::error::EngineError;
use crate::engine::phase::PhaseRegistry;
use crate::engine::unit::{Phase, Status, Unit, UnitBody, UnitId};

/// 调度器内某个求值器的标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct EvaluatorId(u64);

/// 所有单元的状态以及阶段登记表
#[derive(Default)]
pub(crate) struct Table {
    pub(crate) status: HashMap<UnitId, Status>,
    pub(crate) phases: PhaseRegistry,
    /// 每个已认领单元所在的求值器
    owner: HashMap<UnitId, EvaluatorId>,
    /// 每个阻塞中的求值器正在等待的单元
    waiting: HashMap<EvaluatorId, UnitId>,
}

pub(crate) struct Shared {
    pub(crate) table: Mutex<Table>,
    /// 单元离开运行状态时通知
    pub(crate) changed: Condvar,
    pub(crate) limits: LimitConfig,
    next_id: AtomicU64,
    next_evaluator: AtomicU64,
    reporter: Arc<dyn Reporter>,
}

impl Shared {
    pub(crate) fn register(
        this: &Arc<Shared>,
        label: String,
        phase: Option<Phase>,
        body: UnitBody,
    ) -> Arc<Unit> {
        let id = UnitId(this.next_id.fetch_add(1, Ordering::Relaxed));
        let unit = Arc::new(Unit::new(id, label, phase, body, Arc::downgrade(this)));
        let mut table = this.table.lock();
        table.status.insert(id, Status::New);
        table.phases.register(&unit);
        unit
    }

    pub(crate) fn status(&self, id: UnitId) -> Option<Status> {
        self.table.lock().status.get(&id).copied()
    }
}

/// [`Evaluator::attempt`] 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// 单元完成，填充的值是确定的
    Success,
    /// 单元失败，其 Cell 保存哨兵值
    Fail,
    /// 单元在循环中运行，填充的是临时值，之后会重新运行
    Provisional,
    /// 单元已经在本求值器的栈上
    Cycle,
    /// 单元在本求值器栈上，并且已经报告了失败
    Failing,
}

/// 运行单元并缓存结果
///
/// 克隆开销很小，克隆之间共享同一张状态表。
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(limits: LimitConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Table::default()),
                changed: Condvar::new(),
                limits,
                next_id: AtomicU64::new(0),
                next_evaluator: AtomicU64::new(0),
                reporter,
            }),
        }
    }

    /// 创建并登记一个单元
    pub fn unit<F>(&self, label: impl Into<String>, phase: Option<Phase>, body: F) -> Arc<Unit>
    where
        F: Fn(&mut Evaluator<'_>) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        Shared::register(&self.shared, label.into(), phase, Arc::new(body))
    }

    /// 单元的当前状态；未在此登记则为 `None`
    pub fn status(&self, id: UnitId) -> Option<Status> {
        self.shared.status(id)
    }

    /// `phase` 阶段中尚未终结的已登记单元数
    pub fn pending_in(&self, phase: Phase) -> usize {
        self.shared.table.lock().phases.pending_in(phase)
    }

    /// 一个空栈的新求值器
    pub fn evaluator(&self) -> Evaluator<'_> {
        let id = self.shared.next_evaluator.fetch_add(1, Ordering::Relaxed);
        Evaluator {
            id: EvaluatorId(id),
            scheduler: self,
            stack: Vec::new(),
        }
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.shared.limits
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.shared.reporter
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// 把诊断发送给报告器并记录日志
    pub fn report(&self, kind: DiagnosticKind, message: String, location: Location) {
        warn!(
            target: "kiln::scheduler",
            kind = kind.as_str(),
            %location,
            "{message}"
        );
        self.shared.reporter.report(kind, message, location);
    }
}

struct Frame {
    unit: Arc<Unit>,
    /// 本帧经由的最低循环头的下标
    head: Option<usize>,
    fills: Vec<Arc<dyn Slot>>,
    doomed: bool,
}

/// 单个线程求值 Cell 的句柄
///
/// 保存本线程正在运行的单元栈。
pub struct Evaluator<'s> {
    id: EvaluatorId,
    scheduler: &'s Scheduler,
    stack: Vec<Frame>,
}

impl<'s> Evaluator<'s> {
    pub fn scheduler(&self) -> &'s Scheduler {
        self.scheduler
    }

    /// 活动栈上的单元数
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// 当前正在执行函数体的单元
    pub fn current(&self) -> Option<&Arc<Unit>> {
        self.stack.last().map(|frame| &frame.unit)
    }

    pub(crate) fn position(&self, id: UnitId) -> Option<usize> {
        self.stack.iter().rposition(|frame| frame.unit.id() == id)
    }

    /// 运行 `unit`，结果已知时直接返回
    pub fn attempt(&mut self, unit: &Arc<Unit>) -> Result<Attempt, EngineError> {
        if let Some(index) = self.position(unit.id()) {
            return Ok(self.reenter(unit, index));
        }

        let scheduler = self.scheduler;
        let shared = scheduler.shared();
        let mut table = shared.table.lock();
        loop {
            let status = table
                .status
                .get(&unit.id())
                .copied()
                .ok_or(EngineError::UnknownUnit(unit.id()))?;
            match status {
                Status::Success => return Ok(Attempt::Success),
                Status::Fail => return Ok(Attempt::Fail),
                Status::New => {
                    if let Some(phase) = unit.phase() {
                        if table.phases.is_blocked(phase) {
                            drop(table);
                            self.await_phase(unit, phase)?;
                            table = shared.table.lock();
                            continue;
                        }
                    }
                    break;
                }
                _ => {
                    if let Some(head) = self.waits_on_self(&table, unit.id()) {
                        return Ok(self.close_cycle(&mut table, unit, status, head));
                    }
                    trace!(
                        target: "kiln::scheduler",
                        unit = unit.label(),
                        "waiting for unit running on another worker"
                    );
                    table.waiting.insert(self.id, unit.id());
                    let waited = shared.changed.wait_for(&mut table, shared.limits.stall_warning);
                    table.waiting.remove(&self.id);
                    if waited.timed_out() {
                        warn!(
                            target: "kiln::scheduler",
                            unit = unit.label(),
                            status = status.as_str(),
                            "still waiting for unit running on another worker"
                        );
                    }
                }
            }
        }

        if self.stack.len() >= shared.limits.max_depth {
            return Err(EngineError::DepthExceeded {
                unit: unit.label().to_string(),
                limit: shared.limits.max_depth,
            });
        }
        table.status.insert(unit.id(), Status::Running);
        table.owner.insert(unit.id(), self.id);
        drop(table);

        self.run(unit)
    }

    fn reenter(&mut self, unit: &Arc<Unit>, index: usize) -> Attempt {
        {
            let mut table = self.scheduler.shared().table.lock();
            if table.status.get(&unit.id()) == Some(&Status::RunningWillFail) {
                return Attempt::Failing;
            }
            table.status.insert(unit.id(), Status::RunningRecursive);
        }

        self.taint(index);
        debug!(
            target: "kiln::scheduler",
            unit = unit.label(),
            depth = self.stack.len(),
            "cycle detected"
        );
        Attempt::Cycle
    }

    /// 本求值器最终会等待到的、自己栈上单元的下标
    ///
    /// 从运行在其他求值器上的 `unit` 出发，沿所有者和等待关系查找。
    fn waits_on_self(&self, table: &Table, unit: UnitId) -> Option<usize> {
        let mut next = unit;
        for _ in 0..=table.waiting.len() {
            let owner = *table.owner.get(&next)?;
            if owner == self.id {
                return self.position(next);
            }
            next = *table.waiting.get(&owner)?;
        }
        None
    }

    /// 在 `head` 帧处结束一个跨求值器的循环
    fn close_cycle(
        &mut self,
        table: &mut Table,
        unit: &Arc<Unit>,
        status: Status,
        head: usize,
    ) -> Attempt {
        if status == Status::RunningWillFail {
            return Attempt::Failing;
        }
        let head_id = self.stack[head].unit.id();
        if table.status.get(&head_id) == Some(&Status::Running) {
            table.status.insert(head_id, Status::RunningRecursive);
        }

        self.taint(head);
        debug!(
            target: "kiln::scheduler",
            unit = unit.label(),
            head = self.stack[head].unit.label(),
            "cycle detected across evaluators"
        );
        Attempt::Cycle
    }

    fn taint(&mut self, index: usize) {
        for frame in &mut self.stack[index + 1..] {
            frame.head = Some(frame.head.map_or(index, |head| head.min(index)));
        }
    }

    fn run(&mut self, unit: &Arc<Unit>) -> Result<Attempt, EngineError> {
        trace!(target: "kiln::scheduler", unit = unit.label(), id = unit.id().0, "running");

        let index = self.stack.len();
        self.stack.push(Frame {
            unit: unit.clone(),
            head: None,
            fills: Vec::new(),
            doomed: false,
        });
        let result = unit.run(self);
        let frame = self.stack.remove(index);

        let (status, outcome) = match &result {
            Err(_) => (Status::Fail, Attempt::Fail),
            Ok(()) if frame.doomed => (Status::Fail, Attempt::Fail),
            Ok(()) if frame.head.is_some() => (Status::New, Attempt::Provisional),
            Ok(()) => (Status::Success, Attempt::Success),
        };

        match outcome {
            Attempt::Fail if result.is_ok() => frame.fills.iter().for_each(|slot| slot.poison()),
            Attempt::Provisional => frame.fills.iter().for_each(|slot| slot.demote()),
            _ => {}
        }

        let shared = self.scheduler.shared();
        {
            let mut table = shared.table.lock();
            table.status.insert(unit.id(), status);
            table.owner.remove(&unit.id());
            if status.is_terminal() {
                table.phases.settle(unit);
            }
        }
        shared.changed.notify_all();

        trace!(
            target: "kiln::scheduler",
            unit = unit.label(),
            status = status.as_str(),
            "finished"
        );
        result.map(|()| outcome)
    }

    /// 存入当前单元算出的值
    ///
    /// 当前帧是临时帧或即将失败时写入临时值。无论哪种情况都会记下这个
    /// Cell，单元结束时再按帧的结果处理它。
    pub fn fill<T: CellData>(&mut self, cell: &Arc<Cell<T>>, value: T) {
        match self.stack.last_mut() {
            Some(frame) => {
                let soft = frame.head.is_some() || frame.doomed;
                frame.fills.push(cell.clone());
                if soft {
                    cell.update_soft(value);
                } else {
                    cell.update(value);
                }
            }
            None => cell.update(value),
        }
    }

    /// 报告当前单元的真实失败
    ///
    /// 一个单元只有第一次失败会送达报告器。单元以 `Fail` 结束，它填充的
    /// 每个 Cell 都得到哨兵值。
    pub fn fail(&mut self, kind: DiagnosticKind, message: impl Into<String>, location: Location) {
        let message = message.into();
        let scheduler = self.scheduler;
        if let Some(frame) = self.stack.last_mut() {
            if frame.doomed {
                debug!(
                    target: "kiln::scheduler",
                    unit = frame.unit.label(),
                    "suppressed repeated failure: {message}"
                );
                return;
            }
            frame.doomed = true;
            scheduler
                .shared()
                .table
                .lock()
                .status
                .insert(frame.unit.id(), Status::RunningWillFail);
        }
        scheduler.report(kind, message, location);
    }

    /// 报告一条不会让当前单元失败的诊断
    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>, location: Location) {
        self.scheduler.report(kind, message.into(), location);
    }
}
