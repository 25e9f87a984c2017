//! 常量折叠
//!
//! 整数运算按环绕处理，除以零不是常量。

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::DiagnosticKind;
use crate::engine::{EngineError, Evaluator, Phase, Probe};
use crate::equations::{Analysis, AttrKind, Attribute, CONSTANT_PHASE};
use crate::tree::{BinaryOp, NodeId, NodeKind, Tree, UnaryOp};

/// 编译期值
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Const {
    Bool(bool),
    Int(i64),
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Bool(b) => write!(f, "{b}"),
            Const::Int(i) => write!(f, "{i}"),
        }
    }
}

/// 表达式或常量声明的常量值
pub struct Constant;

impl Attribute for Constant {
    type Value = Option<Const>;

    const KIND: AttrKind = AttrKind::Constant;
    const PHASE: Option<Phase> = Some(CONSTANT_PHASE);

    fn fallback() -> Option<Const> {
        None
    }

    fn sentinel() -> Option<Const> {
        None
    }

    fn equation(
        an: &Analysis,
        ev: &mut Evaluator<'_>,
        node: NodeId,
    ) -> Result<Option<Const>, EngineError> {
        let tree = an.tree();
        let children = tree.children(node)?;

        match tree.kind(node)? {
            NodeKind::Bool(b) => Ok(Some(Const::Bool(*b))),
            NodeKind::Int(i) => Ok(Some(Const::Int(*i))),
            NodeKind::ConstDecl(_) => match children.first() {
                Some(init) => operand(an, ev, node, *init),
                None => Ok(None),
            },
            NodeKind::Name(_) => match tree.binding(node) {
                Some(decl) => operand(an, ev, node, decl),
                None => Ok(None),
            },
            NodeKind::Unary(op) => {
                let value = operand(an, ev, node, children[0])?;
                Ok(value.and_then(|v| fold_unary(*op, v)))
            }
            NodeKind::Binary(op) => {
                let lhs = operand(an, ev, node, children[0])?;
                let rhs = operand(an, ev, node, children[1])?;
                Ok(match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => fold_binary(*op, lhs, rhs),
                    _ => None,
                })
            }
            _ => Ok(None),
        }
    }
}

/// `node` 读取到的 `dep` 的常量值
///
/// 常量定义成环时，由闭合循环的那个读者报告，无论求值从哪里进入循环，
/// 都只报告一次。
fn operand(
    an: &Analysis,
    ev: &mut Evaluator<'_>,
    node: NodeId,
    dep: NodeId,
) -> Result<Option<Const>, EngineError> {
    match an.probe::<Constant>(ev, dep)? {
        Probe::Cyclic(_) => {
            let tree = an.tree();
            let location = tree.node(node)?.location;
            let name = enclosing_constant(tree, node)?;
            ev.fail(
                DiagnosticKind::CyclicDefinition,
                format!("constant `{name}` is defined in terms of itself"),
                location,
            );
            Ok(None)
        }
        Probe::Ready(value) | Probe::Failed(value) => Ok(value),
    }
}

/// `node` 所属常量声明的名字
fn enclosing_constant(tree: &Tree, node: NodeId) -> Result<Arc<str>, EngineError> {
    let mut current = Some(node);
    while let Some(id) = current {
        if let NodeKind::ConstDecl(name) = tree.kind(id)? {
            return Ok(name.clone());
        }
        current = tree.parent(id);
    }
    match tree.kind(node)? {
        NodeKind::Name(name) => Ok(name.clone()),
        _ => Ok(Arc::from("<expression>")),
    }
}

pub fn fold_unary(op: UnaryOp, value: Const) -> Option<Const> {
    match (op, value) {
        (UnaryOp::Not, Const::Bool(b)) => Some(Const::Bool(!b)),
        (UnaryOp::Neg, Const::Int(i)) => Some(Const::Int(i.wrapping_neg())),
        _ => None,
    }
}

pub fn fold_binary(op: BinaryOp, lhs: Const, rhs: Const) -> Option<Const> {
    use Const::{Bool, Int};

    match (op, lhs, rhs) {
        (BinaryOp::And, Bool(a), Bool(b)) => Some(Bool(a && b)),
        (BinaryOp::Or, Bool(a), Bool(b)) => Some(Bool(a || b)),
        (BinaryOp::Eq, Bool(a), Bool(b)) => Some(Bool(a == b)),
        (BinaryOp::Eq, Int(a), Int(b)) => Some(Bool(a == b)),
        (BinaryOp::Lt, Int(a), Int(b)) => Some(Bool(a < b)),
        (BinaryOp::Add, Int(a), Int(b)) => Some(Int(a.wrapping_add(b))),
        (BinaryOp::Sub, Int(a), Int(b)) => Some(Int(a.wrapping_sub(b))),
        (BinaryOp::Mul, Int(a), Int(b)) => Some(Int(a.wrapping_mul(b))),
        (BinaryOp::Div, Int(_), Int(0)) => None,
        (BinaryOp::Div, Int(a), Int(b)) => Some(Int(a.wrapping_div(b))),
        _ => None,
    }
}
