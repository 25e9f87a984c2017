//! 方程查询的语义规则
//!
//! 方程库只知道异常集如何在语句间流动。节点自身抛出哪些异常、异常类型之间
//! 的关系，都由 [`RuleProvider`] 提供。

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::sets::{ExcType, TypeSet};
use crate::tree::{NodeId, NodeKind, Tree};

/// 程序违反的规则
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("cannot find function `{0}`")]
    UnknownCallee(String),
    #[error("`{0}` is not a known exception type")]
    UnknownType(ExcType),
}

/// 直接抛出的异常与子类型关系的来源
pub trait RuleProvider: Send + Sync {
    /// `node` 自身抛出的异常，不含子节点
    fn raised(&self, tree: &Tree, node: NodeId) -> Result<TypeSet, Violation>;

    /// 每个 `sub` 是否也是 `sup`
    fn is_subtype(&self, sub: &ExcType, sup: &ExcType) -> bool;
}

/// 基于声明表的规则提供者
///
/// 异常类型构成单继承层次，函数声明自己可能抛出的异常。开启 `strict` 后，
/// 调用未声明的函数或抛出未声明的类型都算违规。
#[derive(Debug, Clone, Default)]
pub struct StaticRules {
    supertypes: HashMap<ExcType, Option<ExcType>>,
    signatures: HashMap<String, Vec<ExcType>>,
    strict: bool,
}

impl StaticRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// 拒绝未声明的被调函数和异常类型
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// 声明一个异常类型及其直接父类型
    pub fn with_type(mut self, name: &str, parent: Option<&str>) -> Self {
        self.supertypes
            .insert(ExcType::new(name), parent.map(ExcType::new));
        self
    }

    /// 声明一个函数及其抛出的异常
    pub fn with_function(mut self, name: &str, raises: &[&str]) -> Self {
        self.signatures.insert(
            name.to_string(),
            raises.iter().map(|ty| ExcType::new(ty)).collect(),
        );
        self
    }

    fn check_type(&self, ty: &ExcType) -> Result<(), Violation> {
        if self.strict && !self.supertypes.contains_key(ty) {
            return Err(Violation::UnknownType(ty.clone()));
        }
        Ok(())
    }
}

impl RuleProvider for StaticRules {
    fn raised(&self, tree: &Tree, node: NodeId) -> Result<TypeSet, Violation> {
        let Ok(kind) = tree.kind(node) else {
            return Ok(TypeSet::new());
        };
        match kind {
            NodeKind::Throw(ty) => {
                self.check_type(ty)?;
                Ok(TypeSet::singleton(ty.clone()))
            }
            NodeKind::Catch(ty) => {
                self.check_type(ty)?;
                Ok(TypeSet::new())
            }
            NodeKind::Call(callee) => match self.signatures.get(&**callee) {
                Some(raises) => Ok(raises.iter().cloned().collect()),
                None if self.strict => Err(Violation::UnknownCallee(callee.to_string())),
                None => Ok(TypeSet::new()),
            },
            _ => Ok(TypeSet::new()),
        }
    }

    fn is_subtype(&self, sub: &ExcType, sup: &ExcType) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(sub.clone());
        while let Some(ty) = current {
            if ty == *sup {
                return true;
            }
            if !seen.insert(ty.clone()) {
                return false;
            }
            current = self.supertypes.get(&ty).cloned().flatten();
        }
        false
    }
}
