//! 方程库报告的诊断信息
//!
//! 真正的失败只会送达 [`Reporter`] 一次。默认报告器 [`DiagnosticBuffer`]
//! 把它们保存在内存中，供调用方检查。

use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

/// 节点的源码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 诊断类别
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    #[error("unreachable statement")]
    UnreachableStatement,
    #[error("invalid jump")]
    InvalidJump,
    #[error("cyclic definition")]
    CyclicDefinition,
    #[error("rule violation")]
    RuleViolation,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnreachableStatement => "unreachable-statement",
            DiagnosticKind::InvalidJump => "invalid-jump",
            DiagnosticKind::CyclicDefinition => "cyclic-definition",
            DiagnosticKind::RuleViolation => "rule-violation",
        }
    }
}

/// 一条已报告的诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Location,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.location, self.kind.as_str(), self.message)
    }
}

/// 诊断的去向
pub trait Reporter: Send + Sync {
    fn report(&self, kind: DiagnosticKind, message: String, location: Location);
}

/// 内存报告器
#[derive(Default)]
pub struct DiagnosticBuffer {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按报告顺序返回全部诊断
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// 取出全部诊断并清空缓冲区
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// 某一类诊断的数量
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.lock().iter().filter(|d| d.kind == kind).count()
    }
}

impl Reporter for DiagnosticBuffer {
    fn report(&self, kind: DiagnosticKind, message: String, location: Location) {
        self.entries.lock().push(Diagnostic {
            kind,
            message,
            location,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_keeps_order() {
        let buffer = DiagnosticBuffer::new();
        buffer.report(DiagnosticKind::InvalidJump, "a".into(), Location::new(2, 1));
        buffer.report(DiagnosticKind::RuleViolation, "b".into(), Location::new(3, 4));

        let all = buffer.snapshot();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "a");
        assert_eq!(buffer.count(DiagnosticKind::RuleViolation), 1);
    }

    #[test]
    fn test_drain_empties_buffer() {
        let buffer = DiagnosticBuffer::new();
        buffer.report(DiagnosticKind::CyclicDefinition, "x".into(), Location::default());
        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic {
            kind: DiagnosticKind::UnreachableStatement,
            message: "unreachable statement".into(),
            location: Location::new(4, 2),
        };
        assert_eq!(
            diag.to_string(),
            "4:2: [unreachable-statement] unreachable statement"
        );
    }
}
