//! Mock 命令接收端
//!
//! 记录所有被接收的命令，并允许测试注入连接失败和接收上限。

use crate::{CommandSink, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockShared {
    sent: Vec<String>,
    connected: bool,
    connect_failures: u32,
    connects: u32,
    disconnects: u32,
    /// 剩余可接收的命令数，`None` 表示不限
    accept_budget: Option<usize>,
    submits: u32,
}

/// Mock 接收端的共享控制句柄
#[derive(Debug, Clone, Default)]
pub struct MockSinkHandle {
    shared: Arc<Mutex<MockShared>>,
}

impl MockSinkHandle {
    /// 接下来 `n` 次 `connect` 失败
    pub fn fail_next_connects(&self, n: u32) {
        self.shared.lock().connect_failures = n;
    }

    /// 之后总共只再接收 `n` 条命令，超出部分被拒绝
    pub fn accept_at_most(&self, n: usize) {
        self.shared.lock().accept_budget = Some(n);
    }

    /// 取消接收上限
    pub fn accept_all(&self) {
        self.shared.lock().accept_budget = None;
    }

    /// 已接收的全部命令（按顺序）
    pub fn sent(&self) -> Vec<String> {
        self.shared.lock().sent.clone()
    }

    /// 取出并清空已接收命令
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.shared.lock().sent)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// 成功连接次数
    pub fn connects(&self) -> u32 {
        self.shared.lock().connects
    }

    /// 断开次数（只统计真正断开的调用）
    pub fn disconnects(&self) -> u32 {
        self.shared.lock().disconnects
    }

    /// `submit` 被调用的次数（含空批次）
    pub fn submits(&self) -> u32 {
        self.shared.lock().submits
    }
}

/// Mock 接收端
#[derive(Debug, Clone)]
pub struct MockSink {
    handle: MockSinkHandle,
    /// 为 `true` 时模拟无连接传输：未 `connect` 也可接收
    connectionless: bool,
}

impl MockSink {
    /// 面向连接的 mock（类似消息总线）
    pub fn new() -> (Self, MockSinkHandle) {
        let handle = MockSinkHandle::default();
        (
            Self {
                handle: handle.clone(),
                connectionless: false,
            },
            handle,
        )
    }

    /// 无连接的 mock（类似 HTTP）
    pub fn connectionless() -> (Self, MockSinkHandle) {
        let (mut sink, handle) = Self::new();
        sink.connectionless = true;
        (sink, handle)
    }
}

impl CommandSink for MockSink {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut shared = self.handle.shared.lock();
        if shared.connect_failures > 0 {
            shared.connect_failures -= 1;
            return Err(TransportError::Connect {
                endpoint: "mock://sink".to_string(),
                message: "connection refused".to_string(),
            });
        }
        shared.connected = true;
        shared.connects += 1;
        Ok(())
    }

    fn submit(&mut self, commands: &[String]) -> usize {
        let mut shared = self.handle.shared.lock();
        shared.submits += 1;
        if !shared.connected && !self.connectionless {
            return 0;
        }

        let mut accepted = commands.len();
        if let Some(budget) = shared.accept_budget.as_mut() {
            accepted = accepted.min(*budget);
            *budget -= accepted;
        }

        shared.sent.extend(commands[..accepted].iter().cloned());
        accepted
    }

    fn disconnect(&mut self) {
        let mut shared = self.handle.shared.lock();
        if shared.connected {
            shared.connected = false;
            shared.disconnects += 1;
        }
    }

    fn endpoint(&self) -> String {
        "mock://sink".to_string()
    }
}
