//! Linux evdev 输入源
//!
//! 通过 `/dev/input/eventN` 读取 `struct input_event` 记录。
//!
//! ## 特性
//!
//! - `EVIOCGRAB` 独占设备，防止桌面环境把旋钮事件当作键盘/滚轮输入
//! - `poll` 零超时就绪检查，主循环不会被读阻塞
//! - 每次 `read` 只读取一条记录，长度不符视为设备故障
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **权限要求**：通常需要 `input` 组权限或 udev 规则

use crate::{InputError, InputSource};
use jogdial_protocol::{EVENT_RECORD_SIZE, RawEvent};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};

// EVIOCGRAB = _IOW('E', 0x90, int)
nix::ioctl_write_int!(eviocgrab, b'E', 0x90);

/// evdev 输入源
#[derive(Debug, Default)]
pub struct EvdevInputSource {
    /// 已打开的设备文件
    file: Option<File>,
    /// 当前设备路径（用于日志）
    path: Option<PathBuf>,
    /// 是否已独占
    grabbed: bool,
}

impl EvdevInputSource {
    /// 创建未打开的输入源
    pub fn new() -> Self {
        Self::default()
    }

    fn file_mut(&mut self) -> Result<&mut File, InputError> {
        self.file.as_mut().ok_or(InputError::NotOpen)
    }
}

impl InputSource for EvdevInputSource {
    fn open(&mut self, path: &Path) -> Result<(), InputError> {
        self.close();

        let file = File::open(path).map_err(|source| InputError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Opened input device '{}'", path.display());
        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn claim_exclusive(&mut self) -> Result<(), InputError> {
        let fd = self.file_mut()?.as_raw_fd();

        // SAFETY: fd 来自仍然存活的 File；EVIOCGRAB 只读取整数参数
        unsafe { eviocgrab(fd, 1) }.map_err(|errno| InputError::Claim(errno.into()))?;

        self.grabbed = true;
        Ok(())
    }

    fn poll_ready(&mut self, timeout: Duration) -> Result<bool, InputError> {
        let file = self.file.as_ref().ok_or(InputError::NotOpen)?;

        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];

        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(0) => Ok(false),
            // POLLERR / POLLHUP 也视为就绪，由随后的 read 暴露错误
            Ok(_) => Ok(true),
            Err(Errno::EINTR) => Ok(false),
            Err(errno) => Err(InputError::Io(errno.into())),
        }
    }

    fn read_one(&mut self) -> Result<RawEvent, InputError> {
        let mut record = [0u8; EVENT_RECORD_SIZE];
        let n = self.file_mut()?.read(&mut record)?;

        if n != EVENT_RECORD_SIZE {
            return Err(InputError::ShortRead {
                expected: EVENT_RECORD_SIZE,
                actual: n,
            });
        }

        let event = RawEvent::from_record(&record)?;
        trace!(
            "input event: type={} code={} value={}",
            event.kind, event.code, event.value
        );
        Ok(event)
    }

    fn close(&mut self) {
        if let Some(file) = self.file.take() {
            if self.grabbed {
                // SAFETY: 同上；释放独占失败不影响关闭
                if let Err(e) = unsafe { eviocgrab(file.as_raw_fd(), 0) } {
                    warn!("Failed to release EVIOCGRAB: {}", e);
                }
            }
            if let Some(path) = self.path.take() {
                debug!("Closed input device '{}'", path.display());
            }
        }
        self.grabbed = false;
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for EvdevInputSource {
    fn drop(&mut self) {
        self.close();
    }
}
