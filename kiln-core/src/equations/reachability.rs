//! 可达性与正常完成
//!
//! `Reachable` 是继承属性：前一条语句能正常完成时语句可以执行；序列中的
//! 第一条语句则看外层语句能否执行。`Completes` 由子节点综合得出。

use crate::engine::{EngineError, Evaluator, Phase};
use crate::equations::{try_parts, Analysis, AttrKind, Attribute, Const, FLOW_PHASE};
use crate::sets::JumpLabel;
use crate::tree::{NodeId, NodeKind};

/// 控制流能否到达节点
pub struct Reachable;

/// 语句能否正常完成
pub struct Completes;

impl Attribute for Reachable {
    type Value = bool;

    const KIND: AttrKind = AttrKind::Reachable;
    const PHASE: Option<Phase> = Some(FLOW_PHASE);

    fn fallback() -> bool {
        true
    }

    fn sentinel() -> bool {
        true
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        let tree = an.tree();
        let Some(parent) = tree.parent(node) else {
            return Ok(true);
        };
        let index = tree.node(node)?.index;
        let siblings = tree.children(parent)?;

        match tree.kind(parent)? {
            NodeKind::Block | NodeKind::Case { .. } if index > 0 => {
                an.completes(ev, siblings[index - 1])
            }
            NodeKind::While if index == 1 => {
                if !an.reachable(ev, parent)? {
                    return Ok(false);
                }
                Ok(an.constant(ev, siblings[0])? != Some(Const::Bool(false)))
            }
            _ => an.reachable(ev, parent),
        }
    }
}

impl Attribute for Completes {
    type Value = bool;

    const KIND: AttrKind = AttrKind::Completes;
    const PHASE: Option<Phase> = Some(FLOW_PHASE);

    fn fallback() -> bool {
        true
    }

    fn sentinel() -> bool {
        true
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        let tree = an.tree();
        let children = tree.children(node)?;

        match tree.kind(node)? {
            NodeKind::Break(_) | NodeKind::Continue(_) | NodeKind::Return | NodeKind::Throw(_) => {
                Ok(false)
            }
            NodeKind::Block | NodeKind::Case { .. } | NodeKind::Catch(_) | NodeKind::Finally => {
                match children.last() {
                    Some(last) => an.completes(ev, *last),
                    None => an.reachable(ev, node),
                }
            }
            NodeKind::If => match children.get(2) {
                Some(otherwise) => Ok(an.completes(ev, children[1])? || an.completes(ev, *otherwise)?),
                None => an.reachable(ev, node),
            },
            NodeKind::While => {
                if !an.reachable(ev, node)? {
                    return Ok(false);
                }
                if an.constant(ev, children[0])? != Some(Const::Bool(true)) {
                    return Ok(true);
                }
                Ok(an.breaks(ev, children[1])?.contains(&JumpLabel::Unlabeled))
            }
            NodeKind::DoWhile => {
                let (body, cond) = (children[0], children[1]);
                let continues = an.continues(ev, body)?;
                let own_label = match tree.parent(node).map(|p| tree.kind(p)).transpose()? {
                    Some(NodeKind::Labeled(label)) => Some(JumpLabel::Named(label.clone())),
                    _ => None,
                };
                let falls_through = an.completes(ev, body)?
                    || continues.contains(&JumpLabel::Unlabeled)
                    || own_label.is_some_and(|label| continues.contains(&label));
                if falls_through && an.constant(ev, cond)? != Some(Const::Bool(true)) {
                    return Ok(true);
                }
                Ok(an.breaks(ev, body)?.contains(&JumpLabel::Unlabeled))
            }
            NodeKind::Labeled(label) => {
                let body = children[0];
                Ok(an.completes(ev, body)?
                    || an.breaks(ev, body)?.contains(&JumpLabel::Named(label.clone())))
            }
            NodeKind::Switch => {
                let cases = &children[1..];
                let has_default = cases
                    .iter()
                    .any(|case| matches!(tree.kind(*case), Ok(NodeKind::Case { default: true })));
                let Some(last) = cases.last().filter(|_| has_default) else {
                    return an.reachable(ev, node);
                };
                if an.completes(ev, *last)? {
                    return Ok(true);
                }
                for case in cases {
                    if an.breaks(ev, *case)?.contains(&JumpLabel::Unlabeled) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            NodeKind::Try => {
                let parts = try_parts(tree, node)?;
                let mut normal = an.completes(ev, parts.body)?;
                for (catch, _) in &parts.catches {
                    normal |= an.completes(ev, *catch)?;
                }
                match parts.finally {
                    Some(finally) => Ok(normal && an.completes(ev, finally)?),
                    None => Ok(normal),
                }
            }
            _ => an.reachable(ev, node),
        }
    }
}
