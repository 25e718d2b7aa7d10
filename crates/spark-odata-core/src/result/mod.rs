//! 动作结果：把处理器的返回值延迟转换为传输层响应。
//!
//! # 教案式说明
//! - **意图（Why）**：写入处理器只描述“返回什么”，具体格式由执行阶段的内容协商决定；
//! - **逻辑（How）**：[`NegotiatedContentResult`] 保存状态码、内容与协商所需的全部协作者，
//!   在 [`ActionResult::execute`] 中完成“序列化 → 协商 → 格式化 → 组装响应”；
//! - **契约（What）**：执行不修改内部状态；取消信号在协商前与格式化后各检查一次，
//!   被打断时返回错误而不是半成品响应。

mod conflict;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;

use crate::{
    contract::Cancellation,
    error::ODataError,
    formatting::FormatterCollection,
    negotiation::{ContentNegotiator, FormattingServices},
};

pub use conflict::ConflictedResult;

/// 可执行为传输层响应的动作结果。
#[async_trait]
pub trait ActionResult: Send + Sync {
    /// 生成响应报文；取消时返回 [`ODataError::Cancelled`]。
    async fn execute(&self, cancellation: &Cancellation) -> Result<Response<Bytes>, ODataError>;
}

/// 请求处理器的上下文：当前请求与宿主的格式化服务。
///
/// 冲突响应的第一条构造路径从这里派生协商器、请求与格式化器。
#[derive(Clone, Debug)]
pub struct ControllerContext {
    request: Arc<Request<Bytes>>,
    formatting: FormattingServices,
}

impl ControllerContext {
    pub fn new(request: Arc<Request<Bytes>>, formatting: FormattingServices) -> Self {
        Self {
            request,
            formatting,
        }
    }

    pub fn request(&self) -> &Arc<Request<Bytes>> {
        &self.request
    }

    pub fn formatting(&self) -> &FormattingServices {
        &self.formatting
    }
}

/// 以内容协商决定响应格式的动作结果。
///
/// # 契约说明（What）
/// - 访问器原样返回构造时提供的协作者；
/// - 协商无结果时返回 `406 Not Acceptable` 且响应体为空，本类型不做其他特殊处理。
pub struct NegotiatedContentResult<T> {
    status: StatusCode,
    content: T,
    negotiator: Arc<dyn ContentNegotiator>,
    request: Arc<Request<Bytes>>,
    formatters: FormatterCollection,
}

impl<T> NegotiatedContentResult<T> {
    pub fn new(
        status: StatusCode,
        content: T,
        negotiator: Arc<dyn ContentNegotiator>,
        request: Arc<Request<Bytes>>,
        formatters: FormatterCollection,
    ) -> Self {
        Self {
            status,
            content,
            negotiator,
            request,
            formatters,
        }
    }

    /// 从请求处理器上下文派生协作者。
    pub fn from_controller(status: StatusCode, content: T, controller: &ControllerContext) -> Self {
        Self::new(
            status,
            content,
            Arc::clone(&controller.formatting.negotiator),
            Arc::clone(&controller.request),
            controller.formatting.formatters.clone(),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn content_negotiator(&self) -> &Arc<dyn ContentNegotiator> {
        &self.negotiator
    }

    pub fn request(&self) -> &Arc<Request<Bytes>> {
        &self.request
    }

    pub fn formatters(&self) -> &FormatterCollection {
        &self.formatters
    }
}

impl<T> fmt::Debug for NegotiatedContentResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiatedContentResult")
            .field("status", &self.status)
            .field("uri", self.request.uri())
            .field("formatters", &self.formatters.len())
            .finish()
    }
}

#[async_trait]
impl<T> ActionResult for NegotiatedContentResult<T>
where
    T: Serialize + Send + Sync,
{
    async fn execute(&self, cancellation: &Cancellation) -> Result<Response<Bytes>, ODataError> {
        cancellation.check("negotiate")?;
        let content = serde_json::to_value(&self.content)?;

        let Some(selected) = self
            .negotiator
            .negotiate(&content, &self.request, &self.formatters)
        else {
            tracing::debug!(
                status = self.status.as_u16(),
                uri = %self.request.uri(),
                "no acceptable media type, responding 406"
            );
            return Ok(Response::builder()
                .status(StatusCode::NOT_ACCEPTABLE)
                .body(Bytes::new())?);
        };

        let body = selected
            .formatter()
            .write(&content, selected.media_type(), cancellation)
            .await?;
        cancellation.check("format")?;

        Ok(Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, selected.media_type().to_string())
            .body(body)?)
    }
}
