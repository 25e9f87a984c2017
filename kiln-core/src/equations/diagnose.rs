//! 整棵树的检查

use kiln_config::Component;
use tracing::debug;

use crate::component_span;
use crate::diagnostics::DiagnosticKind;
use crate::engine::{EngineError, Evaluator, Phase};
use crate::equations::{Analysis, AttrKind, Attribute, FLOW_PHASE};
use crate::logger::is_enabled;
use crate::sets::{ExcType, TypeSet};
use crate::tree::{NodeId, NodeKind};

/// 语句是否开启一段不可达语句
///
/// 计算时就会报告这一段，因此无论检查多少次，每段只报告一次。
pub struct UnreachableRun;

impl Attribute for UnreachableRun {
    type Value = bool;

    const KIND: AttrKind = AttrKind::UnreachableRun;
    const PHASE: Option<Phase> = Some(FLOW_PHASE);

    fn fallback() -> bool {
        false
    }

    fn sentinel() -> bool {
        false
    }

    fn equation(an: &Analysis, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        let starts = an.starts_unreachable_run(ev, node)?;
        if starts {
            ev.report(
                DiagnosticKind::UnreachableStatement,
                "unreachable statement",
                an.tree().node(node)?.location,
            );
        }
        Ok(starts)
    }
}

impl Analysis {
    /// 求出整棵树上的所有属性并报告问题
    ///
    /// 跳转错误、循环常量和规则违规由方程自己报告，每段不可达语句由
    /// [`UnreachableRun`] 报告。再次检查同一棵树不会产生新的报告。
    pub fn diagnose(&self, ev: &mut Evaluator<'_>) -> Result<(), EngineError> {
        let tree = self.tree();
        let _span = component_span!("kiln::equations", "diagnose", nodes = tree.len()).entered();

        let mut unreachable = 0;
        for node in tree.preorder() {
            let kind = tree.kind(node)?;
            match kind {
                NodeKind::ConstDecl(_) => {
                    self.constant(ev, node)?;
                }
                NodeKind::Break(_) => {
                    self.breaks(ev, node)?;
                }
                NodeKind::Continue(_) => {
                    self.continues(ev, node)?;
                }
                _ => {}
            }

            if kind.is_statement() && self.get::<UnreachableRun>(ev, node)? {
                unreachable += 1;
            }
        }

        let escaping = self.propagated(ev, tree.root())?;
        if is_enabled(Component::Equations) {
            debug!(
                target: "kiln::equations",
                unreachable,
                escaping = %format_types(&escaping),
                cells = self.store().len(),
                "diagnose finished"
            );
        }
        Ok(())
    }

    /// 外层语句和前一条语句都可达的不可达语句
    fn starts_unreachable_run(&self, ev: &mut Evaluator<'_>, node: NodeId) -> Result<bool, EngineError> {
        let tree = self.tree();
        let Some(parent) = tree.parent(node) else {
            return Ok(false);
        };
        if matches!(
            tree.kind(node)?,
            NodeKind::Case { .. } | NodeKind::Catch(_) | NodeKind::Finally
        ) {
            return Ok(false);
        }
        if self.reachable(ev, node)? || !self.reachable(ev, parent)? {
            return Ok(false);
        }

        let index = tree.node(node)?.index;
        match tree.kind(parent)? {
            NodeKind::Block | NodeKind::Case { .. } if index > 0 => {
                let previous = tree.children(parent)?[index - 1];
                self.reachable(ev, previous)
            }
            _ => Ok(true),
        }
    }
}

fn format_types(set: &TypeSet) -> String {
    let names: Vec<&str> = set.iter().map(ExcType::name).collect();
    format!("{{{}}}", names.join(", "))
}
