//! 对象池模块
//!
//! 分片扫描的热循环中复用临时缓冲区（如 `KeySet`），避免逐文档分配。
//! 池由单个分片扫描上下文独占，无需线程安全。

/// 可被对象池回收的类型
///
/// 归还时清空内容，但保留已分配的容量
pub trait Recycle {
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// 轻量级对象池
///
/// 要求对象实现 Default，池空时按需新建
#[derive(Debug, Clone)]
pub struct ObjectPool<T: Default + Recycle> {
    pool: Vec<T>,
    max_size: usize,
    created: usize,
}

impl<T: Default + Recycle> ObjectPool<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            pool: Vec::new(),
            max_size,
            created: 0,
        }
    }

    pub fn acquire(&mut self) -> T {
        match self.pool.pop() {
            Some(obj) => obj,
            None => {
                self.created += 1;
                T::default()
            }
        }
    }

    pub fn release(&mut self, mut obj: T) {
        if self.pool.len() < self.max_size {
            obj.recycle();
            self.pool.push(obj);
        }
    }

    pub fn size(&self) -> usize {
        self.pool.len()
    }

    /// 池生命周期内新建的对象数
    pub fn created(&self) -> usize {
        self.created
    }
}

impl<T: Default + Recycle> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(64)
    }
}
