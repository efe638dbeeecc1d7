pub mod connection;
pub mod converter;
pub mod headless;

pub use connection::connect_to_browser;
pub use converter::{ChromeConverter, ChromeSession};
pub use headless::launch_browser;

use chromiumoxide::Handler;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// 在后台处理浏览器事件，返回任务句柄以便释放时终止
async fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    let task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;
    task
}
