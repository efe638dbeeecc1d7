use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use yt_mp3_downloader::models::{load_batch_file, BatchSummary, JobDraft};
use yt_mp3_downloader::utils::{init_log_file, log_startup, print_final_stats, truncate_text};
use yt_mp3_downloader::{
    ChromeConverter, Config, Id3Tagger, JobFlow, Orchestrator, PollingWatcher, ProgressEvent,
};

const USAGE: &str = "用法:
  yt_mp3_downloader <批量文件.csv|批量文件.toml>
  yt_mp3_downloader <视频链接> <艺术家> <标题> <专辑> <音轨号>";

enum Request {
    Batch(PathBuf),
    Single(JobDraft),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    yt_mp3_downloader::utils::logging::init(config.verbose_logging);
    if let Err(e) = init_log_file(&config.output_log_file) {
        warn!("无法写入日志文件 {}: {}", config.output_log_file, e);
    }
    log_startup(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = parse_args(&args)?;

    let flow = JobFlow::new(
        Arc::new(ChromeConverter::new(config.clone())),
        Arc::new(PollingWatcher::new(config.poll_interval())),
        Arc::new(Id3Tagger::new()),
        config.flow_settings(),
    );
    let orchestrator = Orchestrator::spawn(flow)?;

    match request {
        Request::Batch(path) => {
            info!("\n📁 正在读取批量文件: {}", path.display());
            let drafts = load_batch_file(&path).await?;
            if drafts.is_empty() {
                warn!("⚠️ 批量文件中没有任务，程序结束");
                return Ok(ExitCode::SUCCESS);
            }
            orchestrator.submit_batch(drafts)?;
        }
        Request::Single(draft) => orchestrator.submit_job(&draft)?,
    }

    // Ctrl+C 只在两行之间生效
    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到中断信号，当前任务完成后停止");
            cancel.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = pump_events(&orchestrator);
        orchestrator.shutdown();
        outcome
    })
    .await?;

    if let Some(summary) = &outcome.summary {
        print_final_stats(summary, &config.output_log_file);
    }

    Ok(if outcome.all_succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_args(args: &[String]) -> Result<Request> {
    match args {
        [path] => Ok(Request::Batch(PathBuf::from(path))),
        [url, artist, title, album, track] => Ok(Request::Single(JobDraft::new(
            url.as_str(),
            artist.as_str(),
            title.as_str(),
            album.as_str(),
            track.as_str(),
        ))),
        _ => bail!("{}", USAGE),
    }
}

struct Outcome {
    summary: Option<BatchSummary>,
    all_succeeded: bool,
}

/// 在界面线程上取出事件并显示，直到工作线程空闲
fn pump_events(orchestrator: &Orchestrator) -> Outcome {
    let mut outcome = Outcome {
        summary: None,
        all_succeeded: true,
    };

    loop {
        match orchestrator.recv_timeout(Duration::from_millis(200)) {
            Some(event) => report(event, &mut outcome),
            None if !orchestrator.is_busy() => break,
            None => {}
        }
    }
    for event in orchestrator.drain() {
        report(event, &mut outcome);
    }
    outcome
}

fn report(event: ProgressEvent, outcome: &mut Outcome) {
    match event {
        ProgressEvent::ProcessingStarted { row, label } => match row {
            Some(row) => info!("▶️ 第 {} 行: {}", row, truncate_text(&label, 60)),
            None => info!("▶️ {}", truncate_text(&label, 60)),
        },
        ProgressEvent::AutomationInProgress => info!("   正在操作转换网站..."),
        ProgressEvent::WaitingForDownload => info!("   等待下载完成..."),
        ProgressEvent::ApplyingMetadata { path } => info!("   写入元数据: {}", path.display()),
        ProgressEvent::JobSucceeded { path } => info!("   ✅ 已保存: {}", path.display()),
        ProgressEvent::JobFailed { reason, .. } => {
            outcome.all_succeeded = false;
            error!("   ❌ {}", reason);
        }
        ProgressEvent::BatchProgress { index, total, snapshot } => info!(
            "📈 进度 {}/{} (成功 {} / 失败 {} / 跳过 {})",
            index, total, snapshot.succeeded, snapshot.failed, snapshot.skipped
        ),
        ProgressEvent::BatchFinished { summary } => {
            if summary.failed > 0 || summary.skipped > 0 || summary.not_attempted > 0 {
                outcome.all_succeeded = false;
            }
            outcome.summary = Some(summary);
        }
    }
}
