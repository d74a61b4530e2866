//! Mock 输入源
//!
//! 用于测试的模拟拨盘设备。测试代码持有 [`MockInputHandle`]，
//! 在主循环运行期间注入事件、读错误和打开/独占失败。

use crate::{InputError, InputSource};
use jogdial_protocol::{EVENT_RECORD_SIZE, RawEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 一次模拟读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRead {
    /// 正常事件
    Event(RawEvent),
    /// 读错误（如设备被拔出）
    Error,
    /// 短读（返回指定字节数）
    Short(usize),
}

#[derive(Debug, Default)]
struct MockShared {
    reads: VecDeque<MockRead>,
    open_failures: u32,
    claim_failures: u32,
    opens: u32,
    closes: u32,
    open_path: Option<PathBuf>,
    claimed: bool,
}

/// 模拟设备的共享控制句柄
#[derive(Debug, Clone, Default)]
pub struct MockInputHandle {
    shared: Arc<Mutex<MockShared>>,
}

impl MockInputHandle {
    /// 注入一条事件
    pub fn push_event(&self, event: RawEvent) {
        self.shared.lock().reads.push_back(MockRead::Event(event));
    }

    /// 注入一组事件（按顺序）
    pub fn push_events(&self, events: impl IntoIterator<Item = RawEvent>) {
        let mut shared = self.shared.lock();
        shared.reads.extend(events.into_iter().map(MockRead::Event));
    }

    /// 注入一次读错误
    pub fn push_read_error(&self) {
        self.shared.lock().reads.push_back(MockRead::Error);
    }

    /// 注入一次短读
    pub fn push_short_read(&self, len: usize) {
        self.shared.lock().reads.push_back(MockRead::Short(len));
    }

    /// 接下来 `n` 次 `open` 失败
    pub fn fail_next_opens(&self, n: u32) {
        self.shared.lock().open_failures = n;
    }

    /// 接下来 `n` 次 `claim_exclusive` 失败
    pub fn fail_next_claims(&self, n: u32) {
        self.shared.lock().claim_failures = n;
    }

    /// 成功打开的次数
    pub fn opens(&self) -> u32 {
        self.shared.lock().opens
    }

    /// 关闭次数（只统计真正释放了句柄的调用）
    pub fn closes(&self) -> u32 {
        self.shared.lock().closes
    }

    /// 当前打开的路径
    pub fn open_path(&self) -> Option<PathBuf> {
        self.shared.lock().open_path.clone()
    }

    /// 是否已独占
    pub fn is_claimed(&self) -> bool {
        self.shared.lock().claimed
    }

    /// 尚未被读取的条目数
    pub fn pending_reads(&self) -> usize {
        self.shared.lock().reads.len()
    }
}

/// Mock 输入源
#[derive(Debug, Clone, Default)]
pub struct MockInputSource {
    handle: MockInputHandle,
}

impl MockInputSource {
    /// 创建输入源及其控制句柄
    pub fn new() -> (Self, MockInputHandle) {
        let handle = MockInputHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl InputSource for MockInputSource {
    fn open(&mut self, path: &Path) -> Result<(), InputError> {
        let mut shared = self.handle.shared.lock();
        if shared.open_failures > 0 {
            shared.open_failures -= 1;
            return Err(InputError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        shared.opens += 1;
        shared.open_path = Some(path.to_path_buf());
        Ok(())
    }

    fn claim_exclusive(&mut self) -> Result<(), InputError> {
        let mut shared = self.handle.shared.lock();
        if shared.open_path.is_none() {
            return Err(InputError::NotOpen);
        }
        if shared.claim_failures > 0 {
            shared.claim_failures -= 1;
            return Err(InputError::Claim(std::io::Error::from(
                std::io::ErrorKind::ResourceBusy,
            )));
        }
        shared.claimed = true;
        Ok(())
    }

    fn poll_ready(&mut self, _timeout: Duration) -> Result<bool, InputError> {
        let shared = self.handle.shared.lock();
        if shared.open_path.is_none() {
            return Err(InputError::NotOpen);
        }
        Ok(!shared.reads.is_empty())
    }

    fn read_one(&mut self) -> Result<RawEvent, InputError> {
        let mut shared = self.handle.shared.lock();
        if shared.open_path.is_none() {
            return Err(InputError::NotOpen);
        }
        match shared.reads.pop_front() {
            Some(MockRead::Event(event)) => Ok(event),
            Some(MockRead::Error) => Err(InputError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            ))),
            Some(MockRead::Short(actual)) => Err(InputError::ShortRead {
                expected: EVENT_RECORD_SIZE,
                actual,
            }),
            None => Err(InputError::Io(std::io::Error::from(
                std::io::ErrorKind::WouldBlock,
            ))),
        }
    }

    fn close(&mut self) {
        let mut shared = self.handle.shared.lock();
        if shared.open_path.take().is_some() {
            shared.closes += 1;
        }
        shared.claimed = false;
    }

    fn is_open(&self) -> bool {
        self.handle.shared.lock().open_path.is_some()
    }
}
