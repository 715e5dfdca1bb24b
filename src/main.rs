use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use curator_core::config::AppConfig;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod shutdown;

use app::{AppMode, Application};
use shutdown::ShutdownManager;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("curator")
        .version("1.0.0")
        .about("作品审核与自动推送系统")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，缺省时按默认位置查找"),
        )
        .arg(
            Arg::new("run-now")
                .long("run-now")
                .value_name("CONFIG_ID")
                .help("立即执行一次指定的自动推送配置后退出")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");

    // 加载配置
    let config = AppConfig::load(config_path.map(String::as_str)).with_context(|| {
        format!(
            "加载配置文件失败: {}",
            config_path.map(String::as_str).unwrap_or("<默认位置>")
        )
    })?;

    // 初始化日志系统
    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.observability.log_format);
    init_logging(log_level, log_format)?;

    info!("启动作品审核与自动推送系统");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let mode = match matches.get_one::<i64>("run-now") {
        Some(config_id) => AppMode::Once(*config_id),
        None => AppMode::Scheduler,
    };
    let shutdown_timeout = Duration::from_secs(config.auto_push.shutdown_timeout_seconds + 5);

    // 创建应用实例
    let app = Application::new(config).await?;

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();

    // 启动应用
    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        tokio::spawn(async move { app.run(mode, shutdown_rx).await })
    };

    // 单次执行模式下任务结束即退出
    tokio::select! {
        result = &mut app_handle => {
            report(result);
            info!("作品审核与自动推送系统已退出");
            return Ok(());
        }
        _ = wait_for_shutdown_signal() => {}
    }

    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    // 等待应用关闭，设置超时
    match tokio::time::timeout(shutdown_timeout, app_handle).await {
        Ok(result) => report(result),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("作品审核与自动推送系统已退出");
    Ok(())
}

fn report(result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => error!("应用运行失败: {e:#}"),
        Err(e) => error!("应用关闭时发生错误: {e}"),
    }
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
