//! arena 节点

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Location;
use crate::sets::{ExcType, Label};

/// 节点在树中的下标
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Lt,
    Add,
    Sub,
    Mul,
    Div,
}

/// 节点种类
///
/// 各种类的子节点布局：
/// - `If`: 条件、then 分支、可选的 else 分支
/// - `While`: 条件、循环体
/// - `DoWhile`: 循环体、条件
/// - `Switch`: 选择表达式、各个 case
/// - `Try`: 主体、各个 catch、可选的 finally
/// - `Catch` / `Finally`: 处理块
/// - `ConstDecl`: 初始化表达式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Block,
    ExprStmt,
    ConstDecl(Arc<str>),
    If,
    While,
    DoWhile,
    Switch,
    Case { default: bool },
    Labeled(Label),
    Break(Option<Label>),
    Continue(Option<Label>),
    Return,
    Throw(ExcType),
    Try,
    Catch(ExcType),
    Finally,

    Bool(bool),
    Int(i64),
    Name(Arc<str>),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Call(Arc<str>),
}

impl NodeKind {
    pub fn is_statement(&self) -> bool {
        !self.is_expression()
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Bool(_)
                | NodeKind::Int(_)
                | NodeKind::Name(_)
                | NodeKind::Unary(_)
                | NodeKind::Binary(_)
                | NodeKind::Call(_)
        )
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, NodeKind::While | NodeKind::DoWhile)
    }

    /// Cell 标签和日志中使用的短名
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Block => "block",
            NodeKind::ExprStmt => "expr-stmt",
            NodeKind::ConstDecl(_) => "const",
            NodeKind::If => "if",
            NodeKind::While => "while",
            NodeKind::DoWhile => "do-while",
            NodeKind::Switch => "switch",
            NodeKind::Case { .. } => "case",
            NodeKind::Labeled(_) => "labeled",
            NodeKind::Break(_) => "break",
            NodeKind::Continue(_) => "continue",
            NodeKind::Return => "return",
            NodeKind::Throw(_) => "throw",
            NodeKind::Try => "try",
            NodeKind::Catch(_) => "catch",
            NodeKind::Finally => "finally",
            NodeKind::Bool(_) => "bool",
            NodeKind::Int(_) => "int",
            NodeKind::Name(_) => "name",
            NodeKind::Unary(_) => "unary",
            NodeKind::Binary(_) => "binary",
            NodeKind::Call(_) => "call",
        }
    }
}

/// 程序树中的一个节点
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// 在父节点子节点中的位置
    pub index: usize,
    pub location: Location,
}
