//! 程序树
//!
//! 以 [`NodeId`] 寻址的 [`Node`] arena，外加方程会沿着走的非树边：跳转语句
//! 指向目标，常量名指向声明。两者都由 [`TreeBuilder`] 一次性解析。

pub mod builder;
pub mod node;
pub mod syntax;

use std::collections::HashMap;

use thiserror::Error;

use crate::engine::EngineError;
use crate::sets::Label;

pub use builder::TreeBuilder;
pub use node::{BinaryOp, Node, NodeId, NodeKind, UnaryOp};
pub use syntax::{Case, Expr, Stmt};

/// break 或 continue 没有目标的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JumpError {
    #[error("break outside switch or loop")]
    BreakOutside,
    #[error("continue outside of loop")]
    ContinueOutside,
    #[error("undefined label: {0}")]
    UndefinedLabel(Label),
    #[error("not a loop label: {0}")]
    NotALoop(Label),
}

/// 不可变的程序树
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    jumps: HashMap<NodeId, Result<NodeId, JumpError>>,
    bindings: HashMap<NodeId, NodeId>,
}

impl Tree {
    pub(crate) fn new(
        nodes: Vec<Node>,
        root: NodeId,
        jumps: HashMap<NodeId, Result<NodeId, JumpError>>,
        bindings: HashMap<NodeId, NodeId>,
    ) -> Self {
        Self {
            nodes,
            root,
            jumps,
            bindings,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, EngineError> {
        self.nodes.get(id.0).ok_or(EngineError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind, EngineError> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], EngineError> {
        self.node(id).map(|node| node.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// break 或 continue 的目标，其他节点为 `None`
    pub fn jump_target(&self, id: NodeId) -> Option<&Result<NodeId, JumpError>> {
        self.jumps.get(&id)
    }

    /// 常量名引用的声明
    pub fn binding(&self, id: NodeId) -> Option<NodeId> {
        self.bindings.get(&id).copied()
    }

    /// 按先序遍历所有节点
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// `id` 的语句子节点，跳过表达式
    pub fn statements(&self, id: NodeId) -> Result<impl Iterator<Item = NodeId> + '_, EngineError> {
        Ok(self
            .children(id)?
            .iter()
            .copied()
            .filter(|child| self.nodes[child.0].kind.is_statement()))
    }
}

impl From<&Stmt> for Tree {
    fn from(root: &Stmt) -> Self {
        TreeBuilder::build(root)
    }
}
