//! 每个节点的属性 Cell

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{Cell, EngineError};
use crate::equations::{AttrKind, Attribute};
use crate::tree::NodeId;

type Erased = Arc<dyn Any + Send + Sync>;

/// 所有 (节点, 属性) 对的 Cell，首次引用时创建
#[derive(Default)]
pub struct AttrStore {
    cells: Mutex<HashMap<(NodeId, AttrKind), Erased>>,
}

impl AttrStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取 `node` 上 `A` 的 Cell，不存在时用 `create` 创建
    ///
    /// 每一对最多调用一次 `create`，调用时持有 store 锁。
    pub fn cell_or_insert_with<A: Attribute>(
        &self,
        node: NodeId,
        create: impl FnOnce() -> Arc<Cell<A::Value>>,
    ) -> Result<Arc<Cell<A::Value>>, EngineError> {
        let erased = {
            let mut cells = self.cells.lock();
            cells
                .entry((node, A::KIND))
                .or_insert_with(|| create() as Erased)
                .clone()
        };
        erased
            .downcast::<Cell<A::Value>>()
            .map_err(|_| EngineError::AttributeTypeMismatch {
                attribute: A::KIND.as_str(),
                node,
            })
    }

    /// `node` 上 `A` 的 Cell（仅当已创建）
    pub fn get<A: Attribute>(&self, node: NodeId) -> Result<Option<Arc<Cell<A::Value>>>, EngineError> {
        let Some(erased) = self.cells.lock().get(&(node, A::KIND)).cloned() else {
            return Ok(None);
        };
        erased
            .downcast::<Cell<A::Value>>()
            .map(Some)
            .map_err(|_| EngineError::AttributeTypeMismatch {
                attribute: A::KIND.as_str(),
                node,
            })
    }

    /// 目前已创建的 Cell 数
    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.lock().is_empty()
    }
}
