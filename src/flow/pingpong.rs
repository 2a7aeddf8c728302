//! 双缓冲（ping-pong）槽位
//!
//! 每个模拟步从当前槽位读取、向另一个槽位写入，然后交换。
//! 读写槽位在任何时刻都不相同。

/// 两个槽位的交替缓冲
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
    generation: u64,
}

impl<T> PingPong<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
            generation: 0,
        }
    }

    /// 当前（可读）槽位
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    /// 下一个（写入目标）槽位
    pub fn next(&self) -> &T {
        &self.slots[1 - self.current]
    }

    /// 当前槽位的下标（0 或 1）
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 按下标访问槽位
    pub fn slot(&self, index: usize) -> &T {
        &self.slots[index & 1]
    }

    /// 同时借出只读的当前槽位和可写的下一个槽位
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// 交换读写槽位
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.generation += 1;
    }

    /// 已经发生的交换次数
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_alternates() {
        let mut pp = PingPong::new("a", "b");
        assert_eq!((*pp.current(), *pp.next()), ("a", "b"));
        pp.swap();
        assert_eq!((*pp.current(), *pp.next()), ("b", "a"));
        assert_eq!(pp.current_index(), 1);
        pp.swap();
        assert_eq!(*pp.current(), "a");
        assert_eq!(pp.generation(), 2);
    }

    #[test]
    fn test_split_mut_targets_next() {
        let mut pp = PingPong::new(vec![1], vec![2]);
        {
            let (read, write) = pp.split_mut();
            write[0] = read[0] + 10;
        }
        pp.swap();
        assert_eq!(pp.current(), &vec![11]);
        let (read, write) = pp.split_mut();
        assert_eq!(read, &vec![11]);
        assert_eq!(write, &mut vec![1]);
    }
}
