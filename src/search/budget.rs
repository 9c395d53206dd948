use std::cell::Cell;
use std::rc::Rc;

/// 一条读段内所有子搜索共享的回溯计数。
///
/// 由每读段的搜索会话持有并在读段开始时复位为 `ceiling`；子搜索在构造时拿到共享句柄，
/// 每尝试一次替换扣减一次。计数到零后相关子搜索全部停止，这不是错误。
#[derive(Debug)]
pub struct BacktrackBudget {
    remaining: Rc<Cell<u32>>,
    ceiling: u32,
}

impl BacktrackBudget {
    pub fn new(ceiling: u32) -> Self {
        Self { remaining: Rc::new(Cell::new(ceiling)), ceiling }
    }

    /// 共享同一个计数的句柄
    pub fn share(&self) -> Self {
        Self { remaining: Rc::clone(&self.remaining), ceiling: self.ceiling }
    }

    pub fn reset(&self) {
        self.remaining.set(self.ceiling);
    }

    /// 扣减一次；已耗尽时返回 false 且计数保持为 0
    #[inline]
    pub fn try_consume(&self) -> bool {
        match self.remaining.get() {
            0 => false,
            n => {
                self.remaining.set(n - 1);
                true
            }
        }
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining.get()
    }

    #[inline]
    pub fn exhausted(&self) -> bool {
        self.remaining.get() == 0
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_handles_drain_one_counter() {
        let budget = BacktrackBudget::new(3);
        let a = budget.share();
        let b = budget.share();
        assert!(a.try_consume());
        assert!(b.try_consume());
        assert_eq!(budget.remaining(), 1);
        assert!(a.try_consume());
        assert!(!b.try_consume());
        assert!(budget.exhausted());
        budget.reset();
        assert_eq!(a.remaining(), 3);
    }
}
