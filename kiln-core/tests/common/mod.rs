//! 测试辅助工具
//!
//! 从语法构建程序树，并包装成带独立会话和诊断缓冲区的分析。

#![allow(dead_code)]

use std::sync::Arc;

use kiln_core::logger;
use kiln_core::{
    Analysis, Diagnostic, DiagnosticBuffer, DiagnosticKind, EngineConfig, NodeId, NodeKind,
    RuleProvider, Session, StaticRules, Stmt, TreeBuilder,
};

pub struct Fixture {
    pub session: Session,
    pub analysis: Analysis,
}

/// 用宽松规则分析 `root`
pub fn analyze(root: Stmt) -> Fixture {
    analyze_with(root, StaticRules::new())
}

/// 用给定的规则提供者分析 `root`
pub fn analyze_with(root: Stmt, rules: impl RuleProvider + 'static) -> Fixture {
    analyze_config(root, rules, EngineConfig::default())
}

pub fn analyze_config(root: Stmt, rules: impl RuleProvider + 'static, config: EngineConfig) -> Fixture {
    logger::init_test_logger();
    let session = Session::new(config);
    let tree = Arc::new(TreeBuilder::build(&root));
    let analysis = Analysis::new(&session, tree, Arc::new(rules));
    Fixture { session, analysis }
}

impl Fixture {
    pub fn buffer(&self) -> &Arc<DiagnosticBuffer> {
        self.session
            .diagnostics()
            .expect("fixture sessions own a diagnostic buffer")
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.buffer().snapshot()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.buffer().count(kind)
    }

    /// 按先序返回所有满足 `pred` 的节点
    pub fn find(&self, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        let tree = self.analysis.tree();
        tree.preorder()
            .filter(|id| tree.kind(*id).map(&pred).unwrap_or(false))
            .collect()
    }

    /// 唯一满足 `pred` 的节点
    pub fn one(&self, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        let found = self.find(pred);
        assert_eq!(found.len(), 1, "expected exactly one match, got {found:?}");
        found[0]
    }

    /// 调用 `callee` 的表达式语句
    pub fn call_stmt(&self, callee: &str) -> NodeId {
        let call = self.one(|kind| matches!(kind, NodeKind::Call(name) if &**name == callee));
        self.analysis
            .tree()
            .parent(call)
            .expect("call has a parent statement")
    }

    pub fn root(&self) -> NodeId {
        self.analysis.tree().root()
    }
}

/// 异常测试共用的异常层次
pub fn exception_rules() -> StaticRules {
    StaticRules::new()
        .with_type("Throwable", None)
        .with_type("Exception", Some("Throwable"))
        .with_type("IoError", Some("Exception"))
        .with_type("ParseError", Some("Exception"))
        .with_type("Panic", Some("Throwable"))
        .with_function("read", &["IoError"])
        .with_function("parse", &["ParseError"])
        .with_function("print", &[])
}
