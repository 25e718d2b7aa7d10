use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::ODataError;

/// 取消原语，表达响应生成过程的可中断性。
///
/// # 设计背景（Why）
/// - 冲突响应的执行阶段包含内容协商与格式化两步，宿主在客户端断开或超时时需要能够打断；
/// - 通过共享原子位传播取消信号，不绑定具体异步运行时。
///
/// # 逻辑解析（How）
/// - 内部使用 [`AtomicBool`] 表达取消状态，并通过 [`Arc`] 支持多方共享；
/// - `cancel` 在首次成功设置取消位时返回 `true`，重复调用返回 `false`；
/// - `child` 生成共享同一原子位的派生实例。
///
/// # 契约说明（What）
/// - **前置条件**：构造时默认处于“未取消”状态；
/// - **后置条件**：一旦 `cancel` 成功，所有克隆与派生实例的 `is_cancelled` 均立即可见。
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    inner: Arc<AtomicBool>,
}

impl Cancellation {
    /// 创建处于“未取消”状态的取消令牌。
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询当前是否已被标记取消。
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// 将当前令牌标记为取消。
    ///
    /// 返回值为 `true` 表示本次调用首次触发取消。
    pub fn cancel(&self) -> bool {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 派生共享同一原子位的子令牌。
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// 若已取消则返回 [`ODataError::Cancelled`]，`stage` 标识被打断的阶段。
    pub fn check(&self, stage: &'static str) -> Result<(), ODataError> {
        if self.is_cancelled() {
            tracing::debug!(stage, "response production cancelled");
            return Err(ODataError::Cancelled { stage });
        }
        Ok(())
    }
}
