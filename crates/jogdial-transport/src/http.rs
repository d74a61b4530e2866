//! HTTP 接收端（方言 B）
//!
//! 后端提供 `/send?gcode=...` 接口，每条命令本身就是完整的 GET URL，
//! 由命令合成器负责拼接。HTTP 无连接，`connect` 直接成功。

use crate::{CommandSink, TransportError};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认请求超时
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP 接收端
#[derive(Debug)]
pub struct HttpSink {
    client: Client,
    /// 后端根地址，仅用于日志
    base_url: String,
}

impl HttpSink {
    /// 使用默认超时创建
    pub fn new(host: &str, port: u16) -> Result<Self, TransportError> {
        Self::with_timeout(host, port, DEFAULT_REQUEST_TIMEOUT)
    }

    /// 指定请求超时创建
    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("http://{}:{}", host, port),
        })
    }

    fn get(&self, url: &str) -> Result<(), String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", status))
        }
    }
}

impl CommandSink for HttpSink {
    fn connect(&mut self) -> Result<(), TransportError> {
        debug!("HTTP backend {} (connectionless)", self.base_url);
        Ok(())
    }

    fn submit(&mut self, commands: &[String]) -> usize {
        let mut accepted = 0;
        for url in commands {
            match self.get(url) {
                Ok(()) => {
                    debug!("GET {}", url);
                    accepted += 1;
                },
                Err(e) => {
                    warn!("HTTP command failed ({}): {}", url, e);
                    break;
                },
            }
        }
        accepted
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}
