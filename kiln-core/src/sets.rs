//! 逃逸集与异常集使用的不可变紧凑集合
//!
//! 方程算出的集合大多为空或只有一个元素，这两种情况内联存储；更大的集合
//! 共享同一个 `BTreeSet`。

use std::collections::{btree_set, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// 不可变有序集合
///
/// 表示是规范的：`Many` 至少包含两个元素，因此结构相等即集合相等。
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PackedSet<T: Ord> {
    Empty,
    One(T),
    Many(Arc<BTreeSet<T>>),
}

impl<T: Ord + Clone> PackedSet<T> {
    pub fn new() -> Self {
        PackedSet::Empty
    }

    pub fn singleton(value: T) -> Self {
        PackedSet::One(value)
    }

    fn from_btree(mut set: BTreeSet<T>) -> Self {
        match set.len() {
            0 => PackedSet::Empty,
            1 => match set.pop_first() {
                Some(only) => PackedSet::One(only),
                None => PackedSet::Empty,
            },
            _ => PackedSet::Many(Arc::new(set)),
        }
    }

    fn to_btree(&self) -> BTreeSet<T> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        match self {
            PackedSet::Empty => 0,
            PackedSet::One(_) => 1,
            PackedSet::Many(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PackedSet::Empty)
    }

    pub fn contains(&self, value: &T) -> bool {
        match self {
            PackedSet::Empty => false,
            PackedSet::One(v) => v == value,
            PackedSet::Many(set) => set.contains(value),
        }
    }

    /// 加入 `value` 后的集合
    pub fn insert(&self, value: T) -> Self {
        match self {
            PackedSet::Empty => PackedSet::One(value),
            PackedSet::One(v) if *v == value => self.clone(),
            _ if self.contains(&value) => self.clone(),
            _ => {
                let mut set = self.to_btree();
                set.insert(value);
                Self::from_btree(set)
            }
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (PackedSet::Empty, _) => other.clone(),
            (_, PackedSet::Empty) => self.clone(),
            (_, PackedSet::One(v)) => self.insert(v.clone()),
            (PackedSet::One(v), _) => other.insert(v.clone()),
            (PackedSet::Many(a), PackedSet::Many(b)) => {
                if b.is_subset(a) {
                    self.clone()
                } else {
                    Self::from_btree(a.union(b).cloned().collect())
                }
            }
        }
    }

    /// 移除 `value` 后的集合
    pub fn without(&self, value: &T) -> Self {
        if !self.contains(value) {
            return self.clone();
        }
        match self {
            PackedSet::Empty | PackedSet::One(_) => PackedSet::Empty,
            PackedSet::Many(set) => {
                Self::from_btree(set.iter().filter(|v| *v != value).cloned().collect())
            }
        }
    }

    /// 满足 `keep` 的元素
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Self {
        self.iter().filter(|v| keep(v)).cloned().collect()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        match self {
            PackedSet::Empty => Iter::Inline(None),
            PackedSet::One(v) => Iter::Inline(Some(v)),
            PackedSet::Many(set) => Iter::Shared(set.iter()),
        }
    }
}

impl<T: Ord + Clone> Default for PackedSet<T> {
    fn default() -> Self {
        PackedSet::Empty
    }
}

impl<T: Ord + Clone> FromIterator<T> for PackedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_btree(iter.into_iter().collect())
    }
}

impl<T: Ord + Clone + fmt::Debug> fmt::Debug for PackedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// 按升序遍历 [`PackedSet`] 的迭代器
pub enum Iter<'a, T> {
    Inline(Option<&'a T>),
    Shared(btree_set::Iter<'a, T>),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        match self {
            Iter::Inline(slot) => slot.take(),
            Iter::Shared(inner) => inner.next(),
        }
    }
}

impl<'a, T: Ord + Clone> IntoIterator for &'a PackedSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// 语句标签
pub type Label = Arc<str>;

/// break / continue 逃逸集中记录的目标
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JumpLabel {
    Unlabeled,
    Named(Label),
}

impl JumpLabel {
    pub fn named(label: &str) -> Self {
        JumpLabel::Named(Arc::from(label))
    }
}

impl From<Option<Label>> for JumpLabel {
    fn from(label: Option<Label>) -> Self {
        match label {
            Some(name) => JumpLabel::Named(name),
            None => JumpLabel::Unlabeled,
        }
    }
}

/// 异常类型名
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExcType(Arc<str>);

impl ExcType {
    pub fn new(name: &str) -> Self {
        ExcType(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ExcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ExcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 从语句逃逸出去的 break / continue 目标
pub type LabelSet = PackedSet<JumpLabel>;

/// 从节点逃逸出去的异常类型
pub type TypeSet = PackedSet<ExcType>;
