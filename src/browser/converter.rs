//! 转换网站的浏览器会话
//!
//! 每个任务打开独立的会话，流程结束后由 `release()` 关闭页面和（自己启动的）浏览器。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::{connect_to_browser, launch_browser};
use crate::config::Config;
use crate::error::{AppError, AppResult, AutomationError};
use crate::infrastructure::PageDriver;
use crate::services::{BrowserAutomation, BrowserSession};

/// 打开转换网站会话的工厂
#[derive(Clone, Debug)]
pub struct ChromeConverter {
    config: Config,
}

impl ChromeConverter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserAutomation for ChromeConverter {
    async fn open(&self) -> AppResult<Box<dyn BrowserSession>> {
        let (browser, handler) = match self.config.browser_debug_port {
            Some(port) => connect_to_browser(port).await?,
            None => launch_browser(&self.config).await?,
        };
        let owns_browser = self.config.browser_debug_port.is_none();

        let mut session = ChromeSession {
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            owns_browser,
            config: self.config.clone(),
        };

        if let Err(e) = session.prepare().await {
            session.release().await;
            return Err(e);
        }
        Ok(Box::new(session))
    }
}

/// 一次转换会话
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<PageDriver>,
    handler: Option<JoinHandle<()>>,
    /// 连接的是外部浏览器时只关闭页面
    owns_browser: bool,
    config: Config,
}

impl ChromeSession {
    /// 新建页面并把下载目录指向监控目录
    async fn prepare(&mut self) -> AppResult<()> {
        let browser = self.browser.as_ref().ok_or(AutomationError::SessionClosed)?;

        allow_downloads(browser, &self.config.downloads_dir).await;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::interaction_failed("创建页面", e))?;
        self.page = Some(PageDriver::new(page));
        Ok(())
    }

    fn driver(&self) -> AppResult<&PageDriver> {
        Ok(self.page.as_ref().ok_or(AutomationError::SessionClosed)?)
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate_and_submit(&mut self, source_url: &str) -> AppResult<()> {
        let page = self.driver()?;
        info!("🌐 打开转换网站: {}", self.config.converter_url);
        page.goto(&self.config.converter_url, self.config.page_load_timeout())
            .await?;

        page.fill(
            &self.config.url_input_selector,
            source_url,
            "链接输入框",
            self.config.element_timeout(),
        )
        .await?;
        debug!("已填入视频链接");
        Ok(())
    }

    async fn trigger_conversion(&mut self) -> AppResult<()> {
        let page = self.driver()?;
        page.click(
            &self.config.convert_button_selector,
            "转换按钮",
            self.config.element_timeout(),
        )
        .await?;
        info!("🔄 已点击转换");
        Ok(())
    }

    async fn trigger_download(&mut self) -> AppResult<()> {
        let page = self.driver()?;
        let text = &self.config.download_button_text;
        let timeout = self.config.element_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(strategy) = page.click_by_text(text).await? {
                info!("⬇️ 已点击下载 (策略: {})", strategy);
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::element_not_found("下载按钮", text.as_str()));
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    async fn release(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.into_page().close().await {
                debug!("关闭页面失败: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if self.owns_browser {
                if let Err(e) = browser.close().await {
                    warn!("关闭浏览器失败: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    debug!("等待浏览器退出失败: {}", e);
                }
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("浏览器会话已释放");
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// 允许下载并指定目录；失败时浏览器会退回到默认下载目录
async fn allow_downloads(browser: &Browser, dir: &Path) {
    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(dir.to_string_lossy().into_owned())
        .build();

    let result = match params {
        Ok(params) => browser.execute(params).await.map(|_| ()).map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => debug!("下载目录: {}", dir.display()),
        Err(e) => warn!("设置下载目录失败，将使用浏览器默认目录: {}", e),
    }
}
