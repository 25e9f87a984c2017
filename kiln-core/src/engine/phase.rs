//! 阶段屏障
//!
//! 带阶段的单元在到达终态前都登记在这里。只有当更低阶段没有待完成的单元时，
//! 阶段 `k` 的单元才能被认领。等待中的求值器会亲自运行待完成的低阶段单元，
//! 所以屏障不会等待一个没人开始的工作。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::error::EngineError;
use crate::engine::scheduler::{Attempt, Evaluator};
use crate::engine::unit::{Phase, Status, Unit, UnitId};

/// 各阶段已登记但尚未终结的单元
#[derive(Default)]
pub(crate) struct PhaseRegistry {
    pending: BTreeMap<Phase, HashMap<UnitId, Arc<Unit>>>,
}

impl PhaseRegistry {
    pub(crate) fn register(&mut self, unit: &Arc<Unit>) {
        if let Some(phase) = unit.phase() {
            self.pending
                .entry(phase)
                .or_default()
                .insert(unit.id(), unit.clone());
        }
    }

    /// 移除已到达终态的单元
    pub(crate) fn settle(&mut self, unit: &Unit) {
        let Some(phase) = unit.phase() else {
            return;
        };
        if let Some(units) = self.pending.get_mut(&phase) {
            units.remove(&unit.id());
            if units.is_empty() {
                self.pending.remove(&phase);
            }
        }
    }

    /// 是否有低于 `phase` 的单元待完成
    pub(crate) fn is_blocked(&self, phase: Phase) -> bool {
        self.pending.range(..phase).next().is_some()
    }

    /// 低于 `phase` 的待完成单元，低阶段在前
    pub(crate) fn blockers(&self, phase: Phase) -> Vec<(Phase, Arc<Unit>)> {
        self.pending
            .range(..phase)
            .flat_map(|(p, units)| units.values().map(move |u| (*p, u.clone())))
            .collect()
    }

    pub(crate) fn pending_in(&self, phase: Phase) -> usize {
        self.pending.get(&phase).map_or(0, HashMap::len)
    }
}

impl<'s> Evaluator<'s> {
    /// 阻塞直到阶段屏障允许 `unit` 开始
    pub(crate) fn await_phase(&mut self, unit: &Arc<Unit>, phase: Phase) -> Result<(), EngineError> {
        let scheduler = self.scheduler();
        let shared = scheduler.shared();
        let mut table = shared.table.lock();
        loop {
            let blockers = table.phases.blockers(phase);
            if blockers.is_empty() {
                return Ok(());
            }

            if let Some((blocker_phase, blocker)) =
                blockers.iter().find(|(_, b)| self.position(b.id()).is_some())
            {
                return Err(EngineError::PhaseOrder {
                    unit: unit.label().to_string(),
                    phase,
                    blocker: blocker.label().to_string(),
                    blocker_phase: *blocker_phase,
                });
            }

            let idle = blockers
                .into_iter()
                .find(|(_, b)| table.status.get(&b.id()) == Some(&Status::New));

            match idle {
                Some((blocker_phase, blocker)) => {
                    drop(table);
                    debug!(
                        target: "kiln::phase",
                        waiting = unit.label(),
                        helping = blocker.label(),
                        phase = blocker_phase.0,
                        "running earlier-phase unit before barrier"
                    );
                    let helped = self.attempt(&blocker)?;
                    if matches!(
                        helped,
                        Attempt::Provisional | Attempt::Cycle | Attempt::Failing
                    ) {
                        // 它只能在本栈上的某个单元结束之后才能结束
                        return Err(EngineError::PhaseOrder {
                            unit: unit.label().to_string(),
                            phase,
                            blocker: blocker.label().to_string(),
                            blocker_phase,
                        });
                    }
                    table = shared.table.lock();
                }
                None => {
                    let waited = shared
                        .changed
                        .wait_for(&mut table, shared.limits.stall_warning);
                    if waited.timed_out() {
                        warn!(
                            target: "kiln::phase",
                            unit = unit.label(),
                            phase = phase.0,
                            "still waiting for earlier phases running on other workers"
                        );
                    }
                }
            }
        }
    }
}
