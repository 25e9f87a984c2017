//! 异常传播集

use crate::diagnostics::DiagnosticKind;
use crate::engine::{EngineError, Evaluator, Phase};
use crate::equations::{try_parts, Analysis, AttrKind, Attribute, EXCEPTION_PHASE};
use crate::sets::TypeSet;
use crate::tree::{NodeId, NodeKind};

/// 可能从节点逃逸的异常类型
pub struct Propagated;

/// 规则提供者声明的、节点自身抛出的异常类型
///
/// 规则违规只让这个属性失败，节点的子节点仍然计入 [`Propagated`]。
pub struct Raised;

impl Attribute for Raised {
    type Value = TypeSet;

    const KIND: AttrKind = AttrKind::Raised;
    const PHASE: Option<Phase> = Some(EXCEPTION_PHASE);

    fn fallback() -> TypeSet {
        TypeSet::new()
    }

    fn sentinel() -> TypeSet {
        TypeSet::new()
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<TypeSet, EngineError> {
        let tree = an.tree();
        match an.rules().raised(tree, node) {
            Ok(own) => Ok(own),
            Err(violation) => {
                let location = tree.node(node)?.location;
                ev.fail(DiagnosticKind::RuleViolation, violation.to_string(), location);
                Ok(TypeSet::new())
            }
        }
    }
}

impl Attribute for Propagated {
    type Value = TypeSet;

    const KIND: AttrKind = AttrKind::Propagated;
    const PHASE: Option<Phase> = Some(EXCEPTION_PHASE);

    fn fallback() -> TypeSet {
        TypeSet::new()
    }

    fn sentinel() -> TypeSet {
        TypeSet::new()
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<TypeSet, EngineError> {
        if !an.reachable(ev, node)? {
            return Ok(TypeSet::new());
        }

        let tree = an.tree();
        let own = an.get::<Raised>(ev, node)?;

        if let NodeKind::Try = tree.kind(node)? {
            return Ok(own.union(&escaping_try(an, ev, node)?));
        }

        let mut set = own;
        for child in tree.children(node)? {
            set = set.union(&an.propagated(ev, *child)?);
        }
        Ok(set)
    }
}

/// 经由 try 的主体、catch 或 finally 离开的异常类型
fn escaping_try(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<TypeSet, EngineError> {
    let parts = try_parts(an.tree(), node)?;
    let rules = an.rules();

    let mut escaping = an.propagated(ev, parts.body)?.retain(|ty| {
        !parts
            .catches
            .iter()
            .any(|(_, caught)| rules.is_subtype(ty, caught))
    });
    for (catch, _) in &parts.catches {
        escaping = escaping.union(&an.propagated(ev, *catch)?);
    }

    if let Some(finally) = parts.finally {
        let from_finally = an.propagated(ev, finally)?;
        escaping = if an.completes(ev, finally)? {
            escaping.union(&from_finally)
        } else {
            from_finally
        };
    }
    Ok(escaping)
}
