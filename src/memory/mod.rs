//! 进程级内存管理
//!
//! 根据当前内存压力给出各对象池的安全容量，并维护对象池清理注册表。
//! 压力事件发生时，按新的容量裁剪所有已注册的对象池；严重压力下直接清空。
//!
//! 对象池以弱引用注册，池被释放后其注册项会在下一次压力事件时移除。

use crate::config::MemoryConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Weak;
use tracing::{debug, info};

/// 各对象池的容量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSizes {
    /// 流式 chunk 对象池容量
    pub chunk: usize,
}

/// 容量来源
///
/// 对象池在每次归还对象时查询，不做缓存。
pub trait CapacitySource: Send + Sync {
    /// 获取当前容量
    fn pool_sizes(&self) -> PoolSizes;
}

/// 可被内存管理器回收的对象池
pub trait ReclaimablePool: Send + Sync {
    /// 当前空闲对象数
    fn len(&self) -> usize;

    /// 是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前容量
    fn capacity(&self) -> usize;

    /// 裁剪到指定数量
    fn truncate(&self, len: usize);

    /// 清空
    fn clear(&self);
}

/// 内存压力等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl MemoryPressure {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => MemoryPressure::Low,
            1 => MemoryPressure::Medium,
            2 => MemoryPressure::High,
            _ => MemoryPressure::Critical,
        }
    }

    /// 按压力等级缩放基础容量
    pub fn scale(&self, base: usize) -> usize {
        match self {
            MemoryPressure::Low => base,
            MemoryPressure::Medium => base / 2,
            MemoryPressure::High => base / 4,
            MemoryPressure::Critical => 0,
        }
    }
}

/// 注册项
struct CleanupEntry {
    name: String,
    pool: Weak<dyn ReclaimablePool>,
}

/// 内存管理器
pub struct MemoryManager {
    config: MemoryConfig,
    pressure: AtomicU8,
    cleanups: Mutex<Vec<CleanupEntry>>,
}

impl MemoryManager {
    /// 创建新的内存管理器
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            pressure: AtomicU8::new(MemoryPressure::Low as u8),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    /// 当前压力等级
    pub fn pressure(&self) -> MemoryPressure {
        MemoryPressure::from_u8(self.pressure.load(Ordering::Relaxed))
    }

    /// 注册对象池清理
    pub fn register_cleanup(&self, name: impl Into<String>, pool: Weak<dyn ReclaimablePool>) {
        let name = name.into();
        debug!(pool = %name, "注册对象池清理");
        self.cleanups.lock().push(CleanupEntry { name, pool });
    }

    /// 仍然存活的已注册对象池数量
    pub fn registered_pools(&self) -> usize {
        self.cleanups
            .lock()
            .iter()
            .filter(|entry| entry.pool.strong_count() > 0)
            .count()
    }

    /// 处理内存压力事件
    ///
    /// 更新压力等级，并按新容量裁剪所有已注册的对象池。
    /// 返回被回收的对象总数。
    pub fn handle_pressure(&self, level: MemoryPressure) -> usize {
        self.pressure.store(level as u8, Ordering::Relaxed);

        let mut reclaimed = 0;
        let mut cleanups = self.cleanups.lock();
        cleanups.retain(|entry| {
            let Some(pool) = entry.pool.upgrade() else {
                return false;
            };
            let before = pool.len();
            if level == MemoryPressure::Critical {
                pool.clear();
            } else {
                pool.truncate(pool.capacity());
            }
            let freed = before.saturating_sub(pool.len());
            if freed > 0 {
                debug!(pool = %entry.name, freed, "对象池已回收");
            }
            reclaimed += freed;
            true
        });

        info!(?level, reclaimed, "处理内存压力事件");
        reclaimed
    }
}

impl CapacitySource for MemoryManager {
    fn pool_sizes(&self) -> PoolSizes {
        PoolSizes {
            chunk: self.pressure().scale(self.config.chunk_pool_size),
        }
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct VecPool {
        items: Mutex<Vec<u32>>,
        capacity: usize,
    }

    impl ReclaimablePool for VecPool {
        fn len(&self) -> usize {
            self.items.lock().len()
        }

        fn capacity(&self) -> usize {
            self.capacity
        }

        fn truncate(&self, len: usize) {
            self.items.lock().truncate(len);
        }

        fn clear(&self) {
            self.items.lock().clear();
        }
    }

    fn vec_pool(len: u32, capacity: usize) -> Arc<VecPool> {
        Arc::new(VecPool {
            items: Mutex::new((0..len).collect()),
            capacity,
        })
    }

    #[test]
    fn test_pool_sizes_follow_pressure() {
        let manager = MemoryManager::new(MemoryConfig {
            chunk_pool_size: 100,
        });
        assert_eq!(manager.pool_sizes().chunk, 100);

        manager.handle_pressure(MemoryPressure::Medium);
        assert_eq!(manager.pool_sizes().chunk, 50);

        manager.handle_pressure(MemoryPressure::High);
        assert_eq!(manager.pool_sizes().chunk, 25);

        manager.handle_pressure(MemoryPressure::Critical);
        assert_eq!(manager.pool_sizes().chunk, 0);

        manager.handle_pressure(MemoryPressure::Low);
        assert_eq!(manager.pool_sizes().chunk, 100);
    }

    #[test]
    fn test_pressure_trims_registered_pools() {
        let manager = MemoryManager::default();
        let pool = vec_pool(10, 4);
        let weak: Weak<dyn ReclaimablePool> = Arc::downgrade(&pool) as Weak<dyn ReclaimablePool>;
        manager.register_cleanup("test", weak);

        assert_eq!(manager.handle_pressure(MemoryPressure::Medium), 6);
        assert_eq!(pool.len(), 4);

        assert_eq!(manager.handle_pressure(MemoryPressure::Critical), 4);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_dropped_pools_are_unregistered() {
        let manager = MemoryManager::default();
        let pool = vec_pool(3, 3);
        manager.register_cleanup("short-lived", Arc::downgrade(&pool) as Weak<dyn ReclaimablePool>);
        assert_eq!(manager.registered_pools(), 1);

        drop(pool);
        assert_eq!(manager.registered_pools(), 0);
        assert_eq!(manager.handle_pressure(MemoryPressure::Critical), 0);
        assert!(manager.cleanups.lock().is_empty());
    }

    #[test]
    fn test_pressure_serde() {
        let level: MemoryPressure = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(level, MemoryPressure::High);
        assert!(MemoryPressure::Critical > MemoryPressure::Low);
    }
}
