//! 带缓存、惰性填充的 Cell
//!
//! 一个 Cell 保存一个属性值。可以直接用 [`Cell::update`] 填充，也可以在
//! 第一次调用 [`Cell::get`] 时由它的解析单元按需填充。

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::engine::error::EngineError;
use crate::engine::scheduler::{Attempt, Evaluator, Scheduler};
use crate::engine::unit::{Phase, Status, Unit};

/// Cell 值需要满足的约束
pub trait CellData: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CellData for T {}

/// 每次确定性更新时调用的回调
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Cell 的内容
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellValue<T> {
    Unset,
    /// 循环中产生的临时值
    Soft(T),
    /// 最终值；只有 `reset` 或新的解析单元会清除它
    Forced(T),
}

impl<T> CellValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            CellValue::Unset => None,
            CellValue::Soft(v) | CellValue::Forced(v) => Some(v),
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, CellValue::Forced(_))
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, CellValue::Soft(_))
    }
}

/// [`Cell::probe`] 的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Probe<T> {
    /// 正常计算得到
    Ready(T),
    /// 该 Cell 处在正在求值的循环中
    Cyclic(T),
    /// 解析单元失败，值为哨兵值
    Failed(T),
}

impl<T> Probe<T> {
    pub fn into_value(self) -> T {
        match self {
            Probe::Ready(v) | Probe::Cyclic(v) | Probe::Failed(v) => v,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Probe::Cyclic(_))
    }
}

/// 调度器结算栈帧时使用的类型擦除 Cell 视图
pub(crate) trait Slot: Send + Sync {
    /// 把确定值降级为临时值
    fn demote(&self);
    /// 用哨兵值覆盖
    fn poison(&self);
}

struct State<T> {
    value: CellValue<T>,
    resolver: Option<Arc<Unit>>,
    handlers: Vec<Handler<T>>,
}

/// 某个节点某个属性的缓存容器
pub struct Cell<T> {
    name: String,
    state: Mutex<State<T>>,
    fallback: T,
    sentinel: T,
}

impl<T: CellData> Cell<T> {
    /// 创建一个未填充的 Cell
    ///
    /// 经由此 Cell 碰到循环的读者得到 `fallback`；解析单元失败时存入 `sentinel`。
    pub fn new(name: impl Into<String>, fallback: T, sentinel: T) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(State {
                value: CellValue::Unset,
                resolver: None,
                handlers: Vec::new(),
            }),
            fallback,
            sentinel,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fallback(&self) -> &T {
        &self.fallback
    }

    pub fn sentinel(&self) -> &T {
        &self.sentinel
    }

    /// 取值，必要时触发计算
    pub fn get(&self, ev: &mut Evaluator<'_>) -> Result<T, EngineError> {
        self.probe(ev).map(Probe::into_value)
    }

    /// 与 [`get`](Self::get) 相同，但同时说明值是如何得到的
    pub fn probe(&self, ev: &mut Evaluator<'_>) -> Result<Probe<T>, EngineError> {
        let unit = {
            let state = self.state.lock();
            if let CellValue::Forced(v) = &state.value {
                return Ok(Probe::Ready(v.clone()));
            }
            match (&state.resolver, &state.value) {
                (Some(unit), _) => unit.clone(),
                (None, CellValue::Soft(v)) => return Ok(Probe::Ready(v.clone())),
                (None, _) => {
                    return Err(EngineError::MissingResolver {
                        cell: self.name.clone(),
                    })
                }
            }
        };

        let outcome = ev.attempt(&unit)?;
        let current = self.state.lock().value.clone();
        match outcome {
            Attempt::Success | Attempt::Provisional => match current {
                CellValue::Forced(v) | CellValue::Soft(v) => Ok(Probe::Ready(v)),
                CellValue::Unset if outcome == Attempt::Provisional => {
                    self.update_soft(self.fallback.clone());
                    Ok(Probe::Cyclic(self.fallback.clone()))
                }
                CellValue::Unset => Err(EngineError::Unfilled {
                    cell: self.name.clone(),
                    unit: unit.label().to_string(),
                }),
            },
            Attempt::Fail => match current {
                CellValue::Forced(v) => Ok(Probe::Failed(v)),
                _ => {
                    self.update(self.sentinel.clone());
                    Ok(Probe::Failed(self.sentinel.clone()))
                }
            },
            Attempt::Failing => Ok(Probe::Failed(self.sentinel.clone())),
            Attempt::Cycle => match current {
                CellValue::Forced(v) => Ok(Probe::Ready(v)),
                CellValue::Soft(v) => Ok(Probe::Cyclic(v)),
                CellValue::Unset => {
                    debug!(target: "kiln::cell", cell = %self.name, "cycle, using fallback");
                    self.update_soft(self.fallback.clone());
                    Ok(Probe::Cyclic(self.fallback.clone()))
                }
            },
        }
    }

    /// 缓存的值，不触发计算
    pub fn get_cached(&self) -> Option<T> {
        self.state.lock().value.value().cloned()
    }

    /// Cell 内容的快照
    pub fn value(&self) -> CellValue<T> {
        self.state.lock().value.clone()
    }

    /// 存入最终值，并按注册顺序通知回调
    pub fn update(&self, value: T) {
        let handlers = {
            let mut state = self.state.lock();
            state.value = CellValue::Forced(value.clone());
            state.handlers.clone()
        };
        trace!(target: "kiln::cell", cell = %self.name, handlers = handlers.len(), "forced");
        for handler in &handlers {
            handler(&value);
        }
    }

    /// 存入临时值，不通知回调
    pub fn update_soft(&self, value: T) {
        self.state.lock().value = CellValue::Soft(value);
        trace!(target: "kiln::cell", cell = %self.name, "soft");
    }

    /// 清除值，下次 `get` 重新计算
    ///
    /// 已结束的解析单元不会再运行，因此换成同一函数体的新单元。
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.value = CellValue::Unset;
        let renewed = state
            .resolver
            .as_ref()
            .filter(|unit| unit.status().is_some_and(Status::is_terminal))
            .and_then(|unit| unit.renew());
        if let Some(unit) = renewed {
            state.resolver = Some(unit);
        }
        debug!(target: "kiln::cell", cell = %self.name, "reset");
    }

    /// 安装或替换解析单元，同时清除值
    pub fn set_resolver(&self, unit: Arc<Unit>) {
        let mut state = self.state.lock();
        state.value = CellValue::Unset;
        state.resolver = Some(unit);
    }

    pub fn resolver(&self) -> Option<Arc<Unit>> {
        self.state.lock().resolver.clone()
    }

    /// 安装一个用 `rule` 计算本 Cell 值的解析单元
    ///
    /// 生成的单元只在它仍是本 Cell 的解析单元时才填充。
    pub fn set_rule<F>(
        self: &Arc<Self>,
        scheduler: &Scheduler,
        label: impl Into<String>,
        phase: Option<Phase>,
        rule: F,
    ) -> Arc<Unit>
    where
        F: Fn(&mut Evaluator<'_>) -> Result<T, EngineError> + Send + Sync + 'static,
    {
        let cell = Arc::downgrade(self);
        let unit = scheduler.unit(label, phase, move |ev| {
            let value = rule(ev)?;
            if let Some(cell) = cell.upgrade() {
                let current = ev.current().map(|unit| unit.id());
                if current.is_some() && cell.resolver().map(|unit| unit.id()) == current {
                    ev.fill(&cell, value);
                }
            }
            Ok(())
        });
        self.set_resolver(unit.clone());
        unit
    }

    /// 注册一个回调，之后每次 `update` 都会调用
    pub fn add_handler(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.state.lock().handlers.push(Arc::new(handler));
    }
}

impl<T: CellData> Slot for Cell<T> {
    fn demote(&self) {
        let mut state = self.state.lock();
        if let CellValue::Forced(v) = &state.value {
            state.value = CellValue::Soft(v.clone());
        }
    }

    fn poison(&self) {
        self.update(self.sentinel.clone());
    }
}

impl<T: CellData + fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("name", &self.name)
            .field("value", &self.state.lock().value)
            .finish()
    }
}
