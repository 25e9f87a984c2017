//! 方程库
//!
//! 每个节点的每个属性都是一个 [`Cell`]，其解析单元求解一个方程。方程通过
//! [`Analysis`] 读取其他属性，所需的 Cell 在第一次引用时创建，因此求值由
//! 需求驱动，每个 Cell 只计算一次。
//!
//! | 属性 | 值 | 阶段 |
//! |---|---|---|
//! | [`Constant`] | `Option<Const>` | 0 |
//! | [`Reachable`], [`Completes`] | `bool` | 1 |
//! | [`Breaks`], [`Continues`] | [`LabelSet`] | 1 |
//! | [`UnreachableRun`] | `bool` | 1 |
//! | [`Raised`], [`Propagated`] | [`TypeSet`] | 2 |

pub mod constants;
pub mod diagnose;
pub mod escape;
pub mod exceptions;
pub mod reachability;
pub mod store;

use std::sync::Arc;

use crate::engine::{Cell, CellData, EngineError, Evaluator, Phase, Probe, Scheduler};
use crate::rules::RuleProvider;
use crate::session::Session;
use crate::sets::{ExcType, LabelSet, TypeSet};
use crate::tree::{NodeId, NodeKind, Tree};

pub use constants::{Const, Constant};
pub use diagnose::UnreachableRun;
pub use escape::{Breaks, Continues};
pub use exceptions::{Propagated, Raised};
pub use reachability::{Completes, Reachable};
pub use store::AttrStore;

/// 常量折叠最先运行
pub const CONSTANT_PHASE: Phase = Phase(0);
/// 可达性与逃逸集
pub const FLOW_PHASE: Phase = Phase(1);
/// 异常传播
pub const EXCEPTION_PHASE: Phase = Phase(2);

/// 属性族
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Reachable,
    Completes,
    Breaks,
    Continues,
    Propagated,
    Constant,
    UnreachableRun,
    Raised,
}

impl AttrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrKind::Reachable => "reachable",
            AttrKind::Completes => "completes",
            AttrKind::Breaks => "breaks",
            AttrKind::Continues => "continues",
            AttrKind::Propagated => "propagated",
            AttrKind::Constant => "constant",
            AttrKind::UnreachableRun => "unreachable",
            AttrKind::Raised => "raised",
        }
    }
}

/// 带类型的属性族
pub trait Attribute: 'static {
    type Value: CellData;

    const KIND: AttrKind;
    const PHASE: Option<Phase>;

    /// 陷入循环的读者看到的值
    fn fallback() -> Self::Value;

    /// 方程失败时存入的值
    fn sentinel() -> Self::Value;

    fn equation(
        analysis: &Analysis,
        ev: &mut Evaluator<'_>,
        node: NodeId,
    ) -> Result<Self::Value, EngineError>;
}

struct Inner {
    tree: Arc<Tree>,
    rules: Arc<dyn RuleProvider>,
    store: AttrStore,
    scheduler: Scheduler,
}

/// 一棵树的全部属性
///
/// 克隆开销很小，克隆之间共享同一批 Cell。
#[derive(Clone)]
pub struct Analysis {
    inner: Arc<Inner>,
}

impl Analysis {
    pub fn new(session: &Session, tree: Arc<Tree>, rules: Arc<dyn RuleProvider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tree,
                rules,
                store: AttrStore::new(),
                scheduler: session.scheduler().clone(),
            }),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.inner.tree
    }

    pub fn rules(&self) -> &dyn RuleProvider {
        self.inner.rules.as_ref()
    }

    pub fn store(&self) -> &AttrStore {
        &self.inner.store
    }

    /// `node` 上属性 `A` 的 Cell，首次使用时连同方程一起创建
    pub fn cell<A: Attribute>(&self, node: NodeId) -> Result<Arc<Cell<A::Value>>, EngineError> {
        self.tree().node(node)?;
        let scheduler = &self.inner.scheduler;
        let weak = Arc::downgrade(&self.inner);
        self.inner.store.cell_or_insert_with::<A>(node, || {
            let label = format!("{}{}", A::KIND.as_str(), node);
            let cell = Cell::new(label.clone(), A::fallback(), A::sentinel());
            let unit_label = label.clone();
            cell.set_rule(scheduler, label, A::PHASE, move |ev| {
                let inner = weak
                    .upgrade()
                    .ok_or_else(|| EngineError::Detached(unit_label.clone()))?;
                A::equation(&Analysis { inner }, ev, node)
            });
            cell
        })
    }

    pub fn get<A: Attribute>(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<A::Value, EngineError> {
        self.cell::<A>(node)?.get(ev)
    }

    pub fn probe<A: Attribute>(
        &self,
        ev: &mut Evaluator<'_>,
        node: NodeId,
    ) -> Result<Probe<A::Value>, EngineError> {
        self.cell::<A>(node)?.probe(ev)
    }

    pub fn reachable(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        self.get::<Reachable>(ev, node)
    }

    pub fn completes(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        self.get::<Completes>(ev, node)
    }

    pub fn breaks(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<LabelSet, EngineError> {
        self.get::<Breaks>(ev, node)
    }

    pub fn continues(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<LabelSet, EngineError> {
        self.get::<Continues>(ev, node)
    }

    pub fn propagated(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<TypeSet, EngineError> {
        self.get::<Propagated>(ev, node)
    }

    pub fn constant(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<Option<Const>, EngineError> {
        self.get::<Constant>(ev, node)
    }
}

/// 按角色划分的 try 语句子节点
pub(crate) struct TryParts {
    pub(crate) body: NodeId,
    pub(crate) catches: Vec<(NodeId, ExcType)>,
    pub(crate) finally: Option<NodeId>,
}

pub(crate) fn try_parts(tree: &Tree, node: NodeId) -> Result<TryParts, EngineError> {
    let children = tree.children(node)?;
    let body = *children.first().ok_or(EngineError::UnknownNode(node))?;
    let mut catches = Vec::new();
    let mut finally = None;
    for child in &children[1..] {
        match tree.kind(*child)? {
            NodeKind::Catch(ty) => catches.push((*child, ty.clone())),
            NodeKind::Finally => finally = Some(*child),
            _ => {}
        }
    }
    Ok(TryParts {
        body,
        catches,
        finally,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StaticRules;
    use crate::tree::{Stmt, TreeBuilder};

    struct WrongType;

    impl Attribute for WrongType {
        type Value = u32;
        const KIND: AttrKind = AttrKind::Reachable;
        const PHASE: Option<Phase> = None;

        fn fallback() -> u32 {
            0
        }

        fn sentinel() -> u32 {
            0
        }

        fn equation(_: &Analysis, _: &mut Evaluator<'_>, _: NodeId) -> Result<u32, EngineError> {
            Ok(1)
        }
    }

    fn analysis(session: &Session, root: &Stmt) -> Analysis {
        Analysis::new(
            session,
            Arc::new(TreeBuilder::build(root)),
            Arc::new(StaticRules::new()),
        )
    }

    #[test]
    fn test_cells_are_created_once() {
        let session = Session::default();
        let an = analysis(&session, &Stmt::block(vec![Stmt::ret()]));
        let a = an.cell::<Reachable>(NodeId(1)).unwrap();
        let b = an.cell::<Reachable>(NodeId(1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "reachable#1");
        assert_eq!(an.store().len(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let session = Session::default();
        let an = analysis(&session, &Stmt::block(vec![]));
        an.cell::<Reachable>(NodeId(0)).unwrap();
        assert!(matches!(
            an.cell::<WrongType>(NodeId(0)),
            Err(EngineError::AttributeTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_node() {
        let session = Session::default();
        let an = analysis(&session, &Stmt::block(vec![]));
        assert_eq!(
            an.cell::<Completes>(NodeId(9)).unwrap_err(),
            EngineError::UnknownNode(NodeId(9))
        );
    }
}
