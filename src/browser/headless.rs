use chromiumoxide::{Browser, BrowserConfig};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::spawn_handler;
use crate::config::Config;
use crate::error::{AppResult, AutomationError};

/// 按配置启动一个新的浏览器实例
pub async fn launch_browser(config: &Config) -> AppResult<(Browser, JoinHandle<()>)> {
    if config.headless {
        info!("🚀 启动无头浏览器...");
    } else {
        info!("🚀 启动浏览器...");
    }

    let mut builder = BrowserConfig::builder();
    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &config.chrome_executable {
        debug!("浏览器路径: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let browser_config = builder
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--no-first-run",
            "--disable-popup-blocking",
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            AutomationError::LaunchFailed {
                reason: format!("配置浏览器失败: {}", e),
            }
        })?;

    let (browser, handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AutomationError::LaunchFailed {
            reason: e.to_string(),
        }
    })?;
    debug!("浏览器启动成功");

    Ok((browser, spawn_handler(handler).await))
}
