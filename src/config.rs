use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器下载目录（同时也是监控目录）
    pub downloads_dir: PathBuf,
    /// 目标文件扩展名（不带点）
    pub target_extension: String,
    /// 转换网站地址
    pub converter_url: String,
    /// 视频链接输入框选择器
    pub url_input_selector: String,
    /// 转换按钮选择器
    pub convert_button_selector: String,
    /// 下载按钮文字
    pub download_button_text: String,
    /// 浏览器调试端口，设置后连接已有浏览器而不是启动新浏览器
    pub browser_debug_port: Option<u16>,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<PathBuf>,
    /// 是否使用无头模式
    pub headless: bool,
    pub page_load_timeout_secs: u64,
    pub element_timeout_secs: u64,
    /// 点击转换后的固定等待时间
    pub conversion_wait_secs: u64,
    /// 等待下载完成的最长时间
    pub download_timeout_secs: u64,
    /// 文件大小轮询间隔
    pub poll_interval_ms: u64,
    /// 写入成功后是否保留备份
    pub keep_backups: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            target_extension: "mp3".to_string(),
            converter_url: "https://mp3cow.com/".to_string(),
            url_input_selector: "#url".to_string(),
            convert_button_selector: "#bco".to_string(),
            download_button_text: "Download MP3".to_string(),
            browser_debug_port: None,
            chrome_executable: None,
            headless: false,
            page_load_timeout_secs: 30,
            element_timeout_secs: 15,
            conversion_wait_secs: 5,
            download_timeout_secs: 300,
            poll_interval_ms: 1000,
            keep_backups: false,
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：先读 `YTMP3_CONFIG` 指向的 TOML 文件（如有），再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("YTMP3_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        parse_toml(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        parse_toml(content, "<inline>")
    }

    fn with_env_overrides(self) -> Self {
        Self {
            downloads_dir: env_var("DOWNLOADS_DIR").map(PathBuf::from).unwrap_or(self.downloads_dir),
            target_extension: env_var("TARGET_EXTENSION").unwrap_or(self.target_extension),
            converter_url: env_var("CONVERTER_URL").unwrap_or(self.converter_url),
            url_input_selector: env_var("URL_INPUT_SELECTOR").unwrap_or(self.url_input_selector),
            convert_button_selector: env_var("CONVERT_BUTTON_SELECTOR").unwrap_or(self.convert_button_selector),
            download_button_text: env_var("DOWNLOAD_BUTTON_TEXT").unwrap_or(self.download_button_text),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(self.browser_debug_port),
            chrome_executable: env_var("CHROME_EXECUTABLE").map(PathBuf::from).or(self.chrome_executable),
            headless: env_parse("HEADLESS").unwrap_or(self.headless),
            page_load_timeout_secs: env_parse("PAGE_LOAD_TIMEOUT_SECS").unwrap_or(self.page_load_timeout_secs),
            element_timeout_secs: env_parse("ELEMENT_TIMEOUT_SECS").unwrap_or(self.element_timeout_secs),
            conversion_wait_secs: env_parse("CONVERSION_WAIT_SECS").unwrap_or(self.conversion_wait_secs),
            download_timeout_secs: env_parse("DOWNLOAD_TIMEOUT_SECS").unwrap_or(self.download_timeout_secs),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms),
            keep_backups: env_parse("KEEP_BACKUPS").unwrap_or(self.keep_backups),
            output_log_file: env_var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    /// 单任务流程需要的参数
    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            downloads_dir: self.downloads_dir.clone(),
            extension: self.target_extension.clone(),
            conversion_wait: Duration::from_secs(self.conversion_wait_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            keep_backups: self.keep_backups,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

/// 单任务流程参数
#[derive(Clone, Debug)]
pub struct FlowSettings {
    pub downloads_dir: PathBuf,
    pub extension: String,
    pub conversion_wait: Duration,
    pub download_timeout: Duration,
    pub keep_backups: bool,
}

fn parse_toml(content: &str, origin: &str) -> AppResult<Config> {
    toml::from_str(content).map_err(|e| {
        ConfigError::ParseFailed {
            path: origin.to_string(),
            source: e,
        }
        .into()
    })
}

fn default_downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.trim().parse().ok())
}
