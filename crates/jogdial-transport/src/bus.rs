//! 消息总线接收端（方言 A）
//!
//! 通过 WebSocket 持久连接把命令发送给串口 JSON 服务器一类的后端。
//! 每条命令作为一个文本帧发送，命令本身已包含换行。
//!
//! 后端会主动推送状态消息；每次 `submit` 前以极短读超时排空接收方向，
//! 以便及时响应 ping 并发现对端关闭。

use crate::{CommandSink, TransportError};
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use tungstenite::{Message, WebSocket};

/// 默认连接超时
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// 排空接收方向时的读超时
const DRAIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// 消息总线接收端
#[derive(Debug)]
pub struct BusSink {
    host: String,
    port: u16,
    path: String,
    connect_timeout: Duration,
    socket: Option<WebSocket<TcpStream>>,
}

impl BusSink {
    /// 创建接收端（不立即连接）
    ///
    /// `path` 为 WebSocket 路径，如 `"/ws"`。
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket: None,
        }
    }

    /// 设置连接超时
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// WebSocket URL
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.host, self.port, path)
    }

    /// 是否持有连接
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn connect_error(&self, message: impl Into<String>) -> TransportError {
        TransportError::Connect {
            endpoint: self.url(),
            message: message.into(),
        }
    }

    fn open_stream(&self) -> Result<TcpStream, TransportError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.connect_error(format!("resolve failed: {}", e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(self.connect_error(match last_error {
            Some(e) => e.to_string(),
            None => "no address resolved".to_string(),
        }))
    }

    /// 排空后端推送的消息
    ///
    /// 返回 `false` 表示连接已不可用。
    fn drain_incoming(socket: &mut WebSocket<TcpStream>) -> bool {
        loop {
            match socket.read() {
                Ok(msg) => trace!("bus <- {:?}", msg),
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return true;
                },
                Err(e) => {
                    warn!("Message bus receive failed: {}", e);
                    return false;
                },
            }
        }
    }
}

impl CommandSink for BusSink {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.disconnect();

        let url = self.url();
        let stream = self.open_stream()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.connect_timeout))?;
        stream.set_write_timeout(Some(self.connect_timeout))?;

        let (socket, response) = tungstenite::client::client(url.as_str(), stream)
            .map_err(|e| self.connect_error(e.to_string()))?;

        socket.get_ref().set_read_timeout(Some(DRAIN_READ_TIMEOUT))?;

        info!("Message bus connected: {} ({})", url, response.status());
        self.socket = Some(socket);
        Ok(())
    }

    fn submit(&mut self, commands: &[String]) -> usize {
        let Some(socket) = self.socket.as_mut() else {
            return 0;
        };

        if !Self::drain_incoming(socket) {
            self.socket = None;
            return 0;
        }

        let mut accepted = 0;
        for command in commands {
            match socket.send(Message::text(command.clone())) {
                Ok(()) => {
                    debug!("bus -> {:?}", command);
                    accepted += 1;
                },
                Err(e) => {
                    warn!("Message bus send failed after {} command(s): {}", accepted, e);
                    self.socket = None;
                    break;
                },
            }
        }
        accepted
    }

    fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None) {
                trace!("Message bus close: {}", e);
            }
            // 尽量把关闭帧写出去，失败无所谓
            let _ = socket.flush();
            debug!("Message bus disconnected: {}", self.url());
        }
    }

    fn endpoint(&self) -> String {
        self.url()
    }
}

impl Drop for BusSink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
