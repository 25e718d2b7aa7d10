//! 日志安装入口。
//!
//! # 教案式说明
//! - **意图（Why）**：库代码只通过 `tracing` 宏发出事件；宿主在启动时调用一次
//!   [`install_tracing`] 即可把事件输出到标准输出；
//! - **逻辑（How）**：`tracing-subscriber` 组装 `EnvFilter + fmt` 两层，过滤规则取自
//!   `RUST_LOG`，缺省为 `info`；
//! - **契约（What）**：进程内只能成功安装一次；若全局 Subscriber 已被设置（包括本函数的上一次调用），
//!   返回 [`TracingInstallError::SubscriberAlreadySet`]。

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// 安装日志 Subscriber 时可能出现的错误。
#[derive(Debug, thiserror::Error)]
pub enum TracingInstallError {
    /// 进程内已存在全局 Subscriber。
    #[error("全局 tracing Subscriber 已存在，无法重复安装")]
    SubscriberAlreadySet,
    /// 设置全局 Subscriber 失败的底层错误。
    #[error("设置 tracing 全局 Subscriber 失败: {0}")]
    SetGlobalSubscriber(#[from] dispatcher::SetGlobalDefaultError),
}

impl TracingInstallError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SubscriberAlreadySet => "odata.tracing.already_set",
            Self::SetGlobalSubscriber(_) => "odata.tracing.install",
        }
    }
}

/// 安装全局日志 Subscriber。
pub fn install_tracing() -> Result<(), TracingInstallError> {
    if dispatcher::has_been_set() {
        return Err(TracingInstallError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
