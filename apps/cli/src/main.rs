//! # jogdial
//!
//! 把 jog/shuttle 拨盘桥接到 CNC 控制后端。
//!
//! ```bash
//! # 消息总线后端（默认 ws://localhost:8989/ws）
//! jogdial /dev/input/by-id/usb-Contour_Design_ShuttleXpress-event-if00
//!
//! # HTTP 后端
//! jogdial --dialect http --host 192.168.1.20 --port 8080 /dev/input/event5
//!
//! # 查看最终生效的配置
//! jogdial --print-config
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `jogdial=info`。

use anyhow::{Context, Result};
use clap::Parser;
use jogdial_driver::{BridgeBuilder, LogIndicator};
use std::path::PathBuf;
use std::process;

mod settings;

use settings::Overrides;

/// Jog/shuttle dial to CNC backend bridge
#[derive(Parser, Debug)]
#[command(name = "jogdial")]
#[command(about = "Bridge a jog/shuttle dial to a CNC controller backend", long_about = None)]
#[command(version)]
struct Cli {
    /// 输入设备路径（/dev/input/eventN）
    #[arg(required_unless_present = "print_config")]
    device: Option<PathBuf>,

    /// 配置文件（默认 <config_dir>/jogdial/config.toml）
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// 状态变化时输出日志
    #[arg(long)]
    log_status: bool,

    /// 输出最终生效的配置（TOML）后退出
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jogdial=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = settings::load(cli.config.as_deref())?;
    cli.overrides.apply(&mut config)?;

    if cli.print_config {
        print!("{}", toml::to_string(&config).context("Failed to serialize config")?);
        return Ok(());
    }

    let Some(device) = cli.device else {
        anyhow::bail!("missing input device path");
    };

    ctrlc::set_handler(|| {
        tracing::info!("Received interrupt signal. Shutting down...");
        process::exit(0);
    })
    .context("Failed to set signal handler")?;

    let mut builder = BridgeBuilder::new(device).config(config);
    if cli.log_status {
        builder = builder.indicator(LogIndicator::new());
    }

    let mut bridge = builder.build_default()?;
    bridge.run()?;
    Ok(())
}
