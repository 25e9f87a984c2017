//! 前端交来的语法树
//!
//! 这是解析器产出的形状，由 [`TreeBuilder`](super::TreeBuilder) 降级为方程
//! 使用的 arena。

use crate::tree::node::{BinaryOp, UnaryOp};

/// 语句
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expr(Expr),
    Const(String, Expr),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    DoWhile(Box<Stmt>, Expr),
    Switch(Expr, Vec<Case>),
    Labeled(String, Box<Stmt>),
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<Expr>),
    /// 抛出指定名字的异常类型
    Throw(String),
    Try {
        body: Box<Stmt>,
        catches: Vec<(String, Stmt)>,
        finally: Option<Box<Stmt>>,
    },
}

/// switch 中的一组 case
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub default: bool,
    pub body: Vec<Stmt>,
}

/// 表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Stmt {
    pub fn block(stmts: Vec<Stmt>) -> Self {
        Stmt::Block(stmts)
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    /// 无参调用 `callee` 的表达式语句
    pub fn call(callee: &str) -> Self {
        Stmt::Expr(Expr::call(callee, Vec::new()))
    }

    pub fn constant(name: &str, init: Expr) -> Self {
        Stmt::Const(name.to_string(), init)
    }

    pub fn if_then(cond: Expr, then: Stmt) -> Self {
        Stmt::If(cond, Box::new(then), None)
    }

    pub fn if_else(cond: Expr, then: Stmt, otherwise: Stmt) -> Self {
        Stmt::If(cond, Box::new(then), Some(Box::new(otherwise)))
    }

    pub fn while_loop(cond: Expr, body: Stmt) -> Self {
        Stmt::While(cond, Box::new(body))
    }

    pub fn do_while(body: Stmt, cond: Expr) -> Self {
        Stmt::DoWhile(Box::new(body), cond)
    }

    pub fn switch(selector: Expr, cases: Vec<Case>) -> Self {
        Stmt::Switch(selector, cases)
    }

    pub fn labeled(label: &str, stmt: Stmt) -> Self {
        Stmt::Labeled(label.to_string(), Box::new(stmt))
    }

    pub fn brk() -> Self {
        Stmt::Break(None)
    }

    pub fn brk_to(label: &str) -> Self {
        Stmt::Break(Some(label.to_string()))
    }

    pub fn cont() -> Self {
        Stmt::Continue(None)
    }

    pub fn cont_to(label: &str) -> Self {
        Stmt::Continue(Some(label.to_string()))
    }

    pub fn ret() -> Self {
        Stmt::Return(None)
    }

    pub fn throw(ty: &str) -> Self {
        Stmt::Throw(ty.to_string())
    }

    pub fn try_catch(body: Stmt, catches: Vec<(&str, Stmt)>) -> Self {
        Stmt::Try {
            body: Box::new(body),
            catches: owned_catches(catches),
            finally: None,
        }
    }

    pub fn try_finally(body: Stmt, catches: Vec<(&str, Stmt)>, finally: Stmt) -> Self {
        Stmt::Try {
            body: Box::new(body),
            catches: owned_catches(catches),
            finally: Some(Box::new(finally)),
        }
    }
}

fn owned_catches(catches: Vec<(&str, Stmt)>) -> Vec<(String, Stmt)> {
    catches
        .into_iter()
        .map(|(ty, handler)| (ty.to_string(), handler))
        .collect()
}

impl Case {
    pub fn case(body: Vec<Stmt>) -> Self {
        Case {
            default: false,
            body,
        }
    }

    pub fn default(body: Vec<Stmt>) -> Self {
        Case {
            default: true,
            body,
        }
    }
}

impl Expr {
    pub fn bool(value: bool) -> Self {
        Expr::Bool(value)
    }

    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn name(name: &str) -> Self {
        Expr::Name(name.to_string())
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Expr::Call(callee.to_string(), args)
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
}
