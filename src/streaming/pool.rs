//! chunk 对象池
//!
//! 流式补全会产生大量短生命周期的 chunk 对象，复用它们以减少分配。
//!
//! - `acquire` 优先取出空闲对象，否则新建默认对象；取出的对象可能带有旧数据，
//!   调用方必须在使用前覆盖。
//! - `release` 在每次调用时向内存管理器查询容量，池未满才保留对象；
//!   对象池不会重置对象字段，调用方应先调用 `ChatCompletionChunk::reset`。
//!
//! 整个进程共享一个对象池，由调用方持有 `Arc<ChunkPool>` 传递。

use crate::memory::{CapacitySource, MemoryManager, ReclaimablePool};
use crate::streaming::chunk::ChatCompletionChunk;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// 在内存管理器中注册的名称
pub const CHUNK_POOL_NAME: &str = "chunk";

/// chunk 对象池
pub struct ChunkPool {
    free: Mutex<Vec<ChatCompletionChunk>>,
    capacity: Arc<dyn CapacitySource>,
}

impl ChunkPool {
    /// 使用指定容量来源创建对象池
    pub fn new(capacity: Arc<dyn CapacitySource>) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// 创建对象池并在内存管理器中注册清理
    pub fn register(memory: &Arc<MemoryManager>) -> Arc<Self> {
        let pool = Arc::new(Self::new(memory.clone()));
        let weak: Weak<dyn ReclaimablePool> = Arc::downgrade(&pool) as Weak<dyn ReclaimablePool>;
        memory.register_cleanup(CHUNK_POOL_NAME, weak);
        pool
    }

    /// 取出一个 chunk 对象
    pub fn acquire(&self) -> ChatCompletionChunk {
        self.free.lock().pop().unwrap_or_default()
    }

    /// 归还 chunk 对象
    ///
    /// 池已达到当前容量时直接丢弃。
    pub fn release(&self, chunk: ChatCompletionChunk) {
        let max_size = self.capacity.pool_sizes().chunk;
        let mut free = self.free.lock();
        if free.len() < max_size {
            free.push(chunk);
        }
    }

    /// 当前池大小（用于监控）
    pub fn size(&self) -> usize {
        self.free.lock().len()
    }

    /// 清空对象池
    pub fn clear(&self) {
        self.free.lock().clear();
    }
}

impl ReclaimablePool for ChunkPool {
    fn len(&self) -> usize {
        self.size()
    }

    fn capacity(&self) -> usize {
        self.capacity.pool_sizes().chunk
    }

    fn truncate(&self, len: usize) {
        self.free.lock().truncate(len);
    }

    fn clear(&self) {
        ChunkPool::clear(self);
    }
}
