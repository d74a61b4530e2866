//! 待发命令队列
//!
//! 有界 FIFO。队列内同一时刻只允许一类运动命令：
//! 点动步进（离散）与外圈连续运动（连续）互斥，切换类别时先清空队列，
//! 避免已经过时的连续运动排在新的点动之后执行。

use jogdial_transport::CommandSink;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::trace;

/// 命令类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// 点动步进、控制字符、状态广播
    Discrete,
    /// 外圈连续运动（每周期重发）
    Continuous,
}

/// 队列错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// 队列已满
    ///
    /// 每周期都会清空已发送的命令，正常情况下不可能写满；出现即为逻辑缺陷。
    #[error("Command queue overflow (capacity: {capacity})")]
    Overflow { capacity: usize },
}

/// 一次 flush 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushOutcome {
    /// 提交给接收端的命令数
    pub submitted: usize,
    /// 被接收的前缀长度
    pub accepted: usize,
}

impl FlushOutcome {
    /// 是否有命令未被接收
    pub fn is_shortfall(&self) -> bool {
        self.accepted < self.submitted
    }
}

/// 命令队列
#[derive(Debug, Clone)]
pub struct CommandQueue {
    entries: VecDeque<String>,
    class: Option<CommandClass>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            class: None,
            capacity,
        }
    }

    /// 追加一条命令
    ///
    /// 队列中已有另一类命令时先清空。
    pub fn push(&mut self, class: CommandClass, command: String) -> Result<(), QueueError> {
        if self.class != Some(class) && !self.entries.is_empty() {
            trace!(
                "queue class {:?} -> {:?}, dropping {} pending",
                self.class,
                class,
                self.entries.len()
            );
            self.entries.clear();
        }
        if self.entries.len() >= self.capacity {
            return Err(QueueError::Overflow {
                capacity: self.capacity,
            });
        }
        self.entries.push_back(command);
        self.class = Some(class);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.class = None;
    }

    /// 把整个队列按顺序交给接收端，只移除被接收的前缀
    pub fn flush<S: CommandSink + ?Sized>(&mut self, sink: &mut S) -> FlushOutcome {
        if self.entries.is_empty() {
            return FlushOutcome::default();
        }

        let submitted = self.entries.len();
        let accepted = sink.submit(self.entries.make_contiguous()).min(submitted);
        self.entries.drain(..accepted);
        if self.entries.is_empty() {
            self.class = None;
        }

        FlushOutcome {
            submitted,
            accepted,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 还能追加多少条 `class` 类命令（类别不同时队列会先被清空）
    pub fn room_for(&self, class: CommandClass) -> usize {
        if self.class == Some(class) {
            self.capacity - self.entries.len()
        } else {
            self.capacity
        }
    }

    /// 当前队列中命令的类别（空队列为 `None`）
    pub fn class(&self) -> Option<CommandClass> {
        self.class
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }
}
