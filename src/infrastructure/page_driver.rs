//! 页面驱动 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 找元素 / 点击 / 输入"的能力

use std::time::Duration;

use chromiumoxide::element::Element;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{AppError, AppResult, AutomationError};

/// 页面驱动
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 与元素操作能力
/// - 不认识任务 / 转换网站的业务流程
pub struct PageDriver {
    page: Page,
    poll_interval: Duration,
}

impl PageDriver {
    /// 创建新的页面驱动
    pub fn new(page: Page) -> Self {
        Self {
            page,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn into_page(self) -> Page {
        self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(|e| AppError::interaction_failed("执行脚本", e))?;
        let json_value = result
            .into_value()
            .map_err(|e| AppError::interaction_failed("解析脚本结果", e))?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| AppError::interaction_failed("解析脚本结果", e))
    }

    /// 导航到指定地址，超时视为网络问题
    pub async fn goto(&self, url: &str, timeout: Duration) -> AppResult<()> {
        debug!("导航到: {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::navigation_failed(url, e)),
            Err(_) => Err(AutomationError::Timeout {
                step: format!("打开 {}", url),
                secs: timeout.as_secs(),
            }
            .into()),
        }
    }

    /// 轮询直到元素出现
    pub async fn wait_for_element(
        &self,
        selector: &str,
        description: &str,
        timeout: Duration,
    ) -> AppResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if Instant::now() >= deadline => {
                    debug!("查找 {} 失败: {}", selector, e);
                    return Err(AppError::element_not_found(description, selector));
                }
                Err(_) => sleep(self.poll_interval).await,
            }
        }
    }

    /// 点击元素
    pub async fn click(&self, selector: &str, description: &str, timeout: Duration) -> AppResult<()> {
        let element = self.wait_for_element(selector, description, timeout).await?;
        element
            .click()
            .await
            .map_err(|e| AppError::interaction_failed(format!("点击{}", description), e))?;
        Ok(())
    }

    /// 清空输入框后输入文本
    pub async fn fill(
        &self,
        selector: &str,
        text: &str,
        description: &str,
        timeout: Duration,
    ) -> AppResult<()> {
        let element = self.wait_for_element(selector, description, timeout).await?;
        element
            .click()
            .await
            .map_err(|e| AppError::interaction_failed(format!("聚焦{}", description), e))?;

        let clear_js = format!(
            "(() => {{ const el = document.querySelector({}); if (el) {{ el.value = ''; }} return true; }})()",
            serde_json::to_string(selector).unwrap_or_default()
        );
        self.eval(clear_js).await?;

        element
            .type_str(text)
            .await
            .map_err(|e| AppError::interaction_failed(format!("输入{}", description), e))?;
        Ok(())
    }

    /// 按文字查找并点击按钮，依次尝试多种策略
    ///
    /// 返回命中的策略名称；都没找到则返回 None
    pub async fn click_by_text(&self, text: &str) -> AppResult<Option<String>> {
        let js_code = format!(
            r#"
            (() => {{
                const needle = {};
                const lower = needle.toLowerCase();
                const textOf = (el) => (el.textContent || '').trim();
                const isDownloadish = (el) =>
                    /download/i.test(el.id || '') || /download/i.test(String(el.className || ''));
                const buttons = Array.from(document.querySelectorAll('button'));
                const everything = Array.from(document.querySelectorAll('button, a, input[type=button], input[type=submit]'));
                const strategies = [
                    ['exact-text', () => buttons.find(el => textOf(el).includes(needle))],
                    ['case-insensitive-text', () => buttons.find(el => textOf(el).toLowerCase().includes(lower))],
                    ['button-attribute', () => buttons.find(isDownloadish)],
                    ['any-element', () => everything.find(el => /download/i.test(textOf(el)) || isDownloadish(el))],
                ];
                for (const [name, find] of strategies) {{
                    const el = find();
                    if (el && !el.disabled) {{
                        el.click();
                        return name;
                    }}
                }}
                return null;
            }})()
            "#,
            serde_json::to_string(text).unwrap_or_default()
        );

        self.eval_as::<Option<String>>(js_code).await
    }
}
