//! break 与 continue 的逃逸集
//!
//! 语句的逃逸集列出其内部可达、且会跳出该语句的 `break`（或 `continue`）
//! 的目标。循环、switch 和带标签语句会移除自己吸收的目标。

use crate::diagnostics::DiagnosticKind;
use crate::engine::{EngineError, Evaluator, Phase};
use crate::equations::{try_parts, Analysis, AttrKind, Attribute, FLOW_PHASE};
use crate::sets::{JumpLabel, Label, LabelSet};
use crate::tree::{NodeId, NodeKind};

/// 从语句中逃逸的 `break` 目标
pub struct Breaks;

/// 从语句中逃逸的 `continue` 目标
pub struct Continues;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Escape {
    Break,
    Continue,
}

impl Escape {
    fn of(self, an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<LabelSet, EngineError> {
        match self {
            Escape::Break => an.breaks(ev, node),
            Escape::Continue => an.continues(ev, node),
        }
    }
}

impl Attribute for Breaks {
    type Value = LabelSet;

    const KIND: AttrKind = AttrKind::Breaks;
    const PHASE: Option<Phase> = Some(FLOW_PHASE);

    fn fallback() -> LabelSet {
        LabelSet::new()
    }

    fn sentinel() -> LabelSet {
        LabelSet::new()
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<LabelSet, EngineError> {
        escapes(an, ev, node, Escape::Break)
    }
}

impl Attribute for Continues {
    type Value = LabelSet;

    const KIND: AttrKind = AttrKind::Continues;
    const PHASE: Option<Phase> = Some(FLOW_PHASE);

    fn fallback() -> LabelSet {
        LabelSet::new()
    }

    fn sentinel() -> LabelSet {
        LabelSet::new()
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<LabelSet, EngineError> {
        escapes(an, ev, node, Escape::Continue)
    }
}

fn escapes(
    an: &Analysis,
    ev: &mut Evaluator<'_>,
    node: NodeId,
    which: Escape,
) -> Result<LabelSet, EngineError> {
    let tree = an.tree();
    let kind = tree.kind(node)?;

    match kind {
        NodeKind::Break(label) if which == Escape::Break => return jump(an, ev, node, label),
        NodeKind::Continue(label) if which == Escape::Continue => return jump(an, ev, node, label),
        NodeKind::Break(_) | NodeKind::Continue(_) => return Ok(LabelSet::new()),
        _ => {}
    }

    let mut set = LabelSet::new();
    for child in tree.statements(node)? {
        set = set.union(&which.of(an, ev, child)?);
    }

    match kind {
        NodeKind::While | NodeKind::DoWhile => Ok(set.without(&JumpLabel::Unlabeled)),
        NodeKind::Switch if which == Escape::Break => Ok(set.without(&JumpLabel::Unlabeled)),
        NodeKind::Labeled(label) => Ok(set.without(&JumpLabel::Named(label.clone()))),
        NodeKind::Try => match try_parts(tree, node)?.finally {
            Some(finally) if !an.completes(ev, finally)? => which.of(an, ev, finally),
            _ => Ok(set),
        },
        _ => Ok(set),
    }
}

fn jump(
    an: &Analysis,
    ev: &mut Evaluator<'_>,
    node: NodeId,
    label: &Option<Label>,
) -> Result<LabelSet, EngineError> {
    let tree = an.tree();
    match tree.jump_target(node) {
        Some(Err(err)) => {
            let location = tree.node(node)?.location;
            ev.fail(DiagnosticKind::InvalidJump, err.to_string(), location);
            Ok(LabelSet::new())
        }
        Some(Ok(_)) if an.reachable(ev, node)? => {
            Ok(LabelSet::singleton(JumpLabel::from(label.clone())))
        }
        _ => Ok(LabelSet::new()),
    }
}
