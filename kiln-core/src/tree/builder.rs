//! 把语法降级为 arena
//!
//! 节点按先序分配。降级时按这个顺序给每条语句分配一行，表达式与所在语句
//! 共用一行，按列编号。

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostics::Location;
use crate::sets::{ExcType, Label};
use crate::tree::node::{Node, NodeId, NodeKind};
use crate::tree::syntax::{Expr, Stmt};
use crate::tree::{JumpError, Tree};

/// 从语法构建 [`Tree`]
#[derive(Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    line: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 降级 `root`，并解析跳转目标和名字绑定
    pub fn build(root: &Stmt) -> Tree {
        let mut builder = TreeBuilder::new();
        let root = builder.stmt(root, None);
        builder.finish(root)
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>, location: Location) -> NodeId {
        let id = NodeId(self.nodes.len());
        let index = match parent {
            Some(parent) => {
                let siblings = &mut self.nodes[parent.0].children;
                siblings.push(id);
                siblings.len() - 1
            }
            None => 0,
        };
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
            parent,
            index,
            location,
        });
        id
    }

    fn stmt(&mut self, stmt: &Stmt, parent: Option<NodeId>) -> NodeId {
        self.line += 1;
        let location = Location::new(self.line, 1);
        let mut column = 1;

        match stmt {
            Stmt::Block(stmts) => {
                let id = self.alloc(NodeKind::Block, parent, location);
                for s in stmts {
                    self.stmt(s, Some(id));
                }
                id
            }
            Stmt::Expr(expr) => {
                let id = self.alloc(NodeKind::ExprStmt, parent, location);
                self.expr(expr, id, &mut column);
                id
            }
            Stmt::Const(name, init) => {
                let id = self.alloc(NodeKind::ConstDecl(Arc::from(name.as_str())), parent, location);
                self.expr(init, id, &mut column);
                id
            }
            Stmt::If(cond, then, otherwise) => {
                let id = self.alloc(NodeKind::If, parent, location);
                self.expr(cond, id, &mut column);
                self.stmt(then, Some(id));
                if let Some(otherwise) = otherwise {
                    self.stmt(otherwise, Some(id));
                }
                id
            }
            Stmt::While(cond, body) => {
                let id = self.alloc(NodeKind::While, parent, location);
                self.expr(cond, id, &mut column);
                self.stmt(body, Some(id));
                id
            }
            Stmt::DoWhile(body, cond) => {
                let id = self.alloc(NodeKind::DoWhile, parent, location);
                self.stmt(body, Some(id));
                self.expr(cond, id, &mut column);
                id
            }
            Stmt::Switch(selector, cases) => {
                let id = self.alloc(NodeKind::Switch, parent, location);
                self.expr(selector, id, &mut column);
                for case in cases {
                    self.line += 1;
                    let case_id = self.alloc(
                        NodeKind::Case {
                            default: case.default,
                        },
                        Some(id),
                        Location::new(self.line, 1),
                    );
                    for s in &case.body {
                        self.stmt(s, Some(case_id));
                    }
                }
                id
            }
            Stmt::Labeled(label, body) => {
                let id = self.alloc(NodeKind::Labeled(label_of(label)), parent, location);
                self.stmt(body, Some(id));
                id
            }
            Stmt::Break(label) => {
                self.alloc(NodeKind::Break(label.as_deref().map(label_of)), parent, location)
            }
            Stmt::Continue(label) => {
                self.alloc(NodeKind::Continue(label.as_deref().map(label_of)), parent, location)
            }
            Stmt::Return(value) => {
                let id = self.alloc(NodeKind::Return, parent, location);
                if let Some(value) = value {
                    self.expr(value, id, &mut column);
                }
                id
            }
            Stmt::Throw(ty) => self.alloc(NodeKind::Throw(ExcType::new(ty)), parent, location),
            Stmt::Try {
                body,
                catches,
                finally,
            } => {
                let id = self.alloc(NodeKind::Try, parent, location);
                self.stmt(body, Some(id));
                for (ty, handler) in catches {
                    self.line += 1;
                    let catch_id = self.alloc(
                        NodeKind::Catch(ExcType::new(ty)),
                        Some(id),
                        Location::new(self.line, 1),
                    );
                    self.stmt(handler, Some(catch_id));
                }
                if let Some(finally) = finally {
                    self.line += 1;
                    let finally_id =
                        self.alloc(NodeKind::Finally, Some(id), Location::new(self.line, 1));
                    self.stmt(finally, Some(finally_id));
                }
                id
            }
        }
    }

    fn expr(&mut self, expr: &Expr, parent: NodeId, column: &mut usize) -> NodeId {
        *column += 1;
        let location = Location::new(self.line, *column);
        match expr {
            Expr::Bool(value) => self.alloc(NodeKind::Bool(*value), Some(parent), location),
            Expr::Int(value) => self.alloc(NodeKind::Int(*value), Some(parent), location),
            Expr::Name(name) => {
                self.alloc(NodeKind::Name(Arc::from(name.as_str())), Some(parent), location)
            }
            Expr::Unary(op, operand) => {
                let id = self.alloc(NodeKind::Unary(*op), Some(parent), location);
                self.expr(operand, id, column);
                id
            }
            Expr::Binary(op, lhs, rhs) => {
                let id = self.alloc(NodeKind::Binary(*op), Some(parent), location);
                self.expr(lhs, id, column);
                self.expr(rhs, id, column);
                id
            }
            Expr::Call(callee, args) => {
                let id = self.alloc(NodeKind::Call(Arc::from(callee.as_str())), Some(parent), location);
                for arg in args {
                    self.expr(arg, id, column);
                }
                id
            }
        }
    }

    /// 解析非树边并冻结 arena
    pub fn finish(self, root: NodeId) -> Tree {
        let nodes = self.nodes;

        let mut constants: HashMap<Arc<str>, NodeId> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if let NodeKind::ConstDecl(name) = &node.kind {
                constants.entry(name.clone()).or_insert(NodeId(i));
            }
        }

        let mut bindings = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if let NodeKind::Name(name) = &node.kind {
                if let Some(decl) = constants.get(name) {
                    bindings.insert(NodeId(i), *decl);
                }
            }
        }

        let mut jumps = HashMap::new();
        let mut enclosing = Vec::new();
        resolve_jumps(&nodes, root, &mut enclosing, &mut jumps);

        Tree::new(nodes, root, jumps, bindings)
    }
}

fn label_of(name: &str) -> Label {
    Arc::from(name)
}

fn resolve_jumps(
    nodes: &[Node],
    id: NodeId,
    enclosing: &mut Vec<NodeId>,
    jumps: &mut HashMap<NodeId, Result<NodeId, JumpError>>,
) {
    let node = &nodes[id.0];
    match &node.kind {
        NodeKind::Break(label) => {
            let target = match label {
                None => innermost(nodes, enclosing, |kind| {
                    kind.is_loop() || *kind == NodeKind::Switch
                })
                .ok_or(JumpError::BreakOutside),
                Some(label) => labeled(nodes, enclosing, label)
                    .ok_or_else(|| JumpError::UndefinedLabel(label.clone())),
            };
            jumps.insert(id, target);
        }
        NodeKind::Continue(label) => {
            let target = match label {
                None => innermost(nodes, enclosing, NodeKind::is_loop).ok_or(JumpError::ContinueOutside),
                Some(label) => match labeled(nodes, enclosing, label) {
                    None => Err(JumpError::UndefinedLabel(label.clone())),
                    Some(stmt) => {
                        let body = nodes[stmt.0].children.first().map(|c| &nodes[c.0].kind);
                        match body {
                            Some(kind) if kind.is_loop() => Ok(stmt),
                            _ => Err(JumpError::NotALoop(label.clone())),
                        }
                    }
                },
            };
            jumps.insert(id, target);
        }
        _ => {}
    }

    let scoped = matches!(
        node.kind,
        NodeKind::While | NodeKind::DoWhile | NodeKind::Switch | NodeKind::Labeled(_)
    );
    if scoped {
        enclosing.push(id);
    }
    for child in &node.children {
        resolve_jumps(nodes, *child, enclosing, jumps);
    }
    if scoped {
        enclosing.pop();
    }
}

fn innermost(
    nodes: &[Node],
    enclosing: &[NodeId],
    accepts: impl Fn(&NodeKind) -> bool,
) -> Option<NodeId> {
    enclosing
        .iter()
        .rev()
        .copied()
        .find(|id| accepts(&nodes[id.0].kind))
}

fn labeled(nodes: &[Node], enclosing: &[NodeId], label: &Label) -> Option<NodeId> {
    innermost(nodes, enclosing, |kind| {
        matches!(kind, NodeKind::Labeled(l) if l == label)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::syntax::Case;

    #[test]
    fn test_preorder_layout() {
        let tree = TreeBuilder::build(&Stmt::block(vec![Stmt::ret(), Stmt::call("print")]));
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.kind(NodeId(1)).unwrap(), &NodeKind::Return);
        assert_eq!(tree.children(tree.root()).unwrap(), &[NodeId(1), NodeId(2)]);
        assert_eq!(tree.parent(NodeId(3)), Some(NodeId(2)));
        assert_eq!(tree.node(NodeId(2)).unwrap().location, Location::new(3, 1));
    }

    #[test]
    fn test_break_targets() {
        let tree = TreeBuilder::build(&Stmt::block(vec![
            Stmt::while_loop(
                Expr::bool(true),
                Stmt::switch(Expr::int(1), vec![Case::case(vec![Stmt::brk()])]),
            ),
            Stmt::brk(),
        ]));

        let breaks: Vec<_> = (0..tree.len())
            .map(NodeId)
            .filter(|id| matches!(tree.kind(*id), Ok(NodeKind::Break(_))))
            .collect();
        assert_eq!(breaks.len(), 2);

        let switch = tree.parent(tree.parent(breaks[0]).unwrap()).unwrap();
        assert_eq!(tree.jump_target(breaks[0]), Some(&Ok(switch)));
        assert_eq!(tree.jump_target(breaks[1]), Some(&Err(JumpError::BreakOutside)));
    }

    #[test]
    fn test_labeled_continue() {
        let tree = TreeBuilder::build(&Stmt::block(vec![
            Stmt::labeled("outer", Stmt::while_loop(Expr::bool(true), Stmt::cont_to("outer"))),
            Stmt::labeled("plain", Stmt::block(vec![Stmt::cont_to("plain")])),
            Stmt::cont_to("missing"),
        ]));

        let continues: Vec<_> = (0..tree.len())
            .map(NodeId)
            .filter(|id| matches!(tree.kind(*id), Ok(NodeKind::Continue(_))))
            .collect();

        assert!(matches!(tree.jump_target(continues[0]), Some(Ok(_))));
        assert_eq!(
            tree.jump_target(continues[1]),
            Some(&Err(JumpError::NotALoop(Arc::from("plain"))))
        );
        assert_eq!(
            tree.jump_target(continues[2]),
            Some(&Err(JumpError::UndefinedLabel(Arc::from("missing"))))
        );
    }

    #[test]
    fn test_constant_bindings() {
        let tree = TreeBuilder::build(&Stmt::block(vec![
            Stmt::constant("a", Expr::name("b")),
            Stmt::constant("b", Expr::int(2)),
            Stmt::expr(Expr::name("unknown")),
        ]));

        assert_eq!(tree.binding(NodeId(2)), Some(NodeId(3)));
        assert_eq!(tree.binding(NodeId(6)), None);
    }
}
