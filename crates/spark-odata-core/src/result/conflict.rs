use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use serde::Serialize;

use super::{ActionResult, ControllerContext, NegotiatedContentResult};
use crate::{
    contract::Cancellation, error::ODataError, formatting::FormatterCollection,
    negotiation::ContentNegotiator,
};

/// 以 `412 Precondition Failed` 返回冲突实体的动作结果。
///
/// # 教案式说明
/// - **意图（Why）**：乐观并发校验失败时，客户端需要拿到服务端当前的实体以便重试；
///   响应格式与普通读请求一样经由内容协商决定；
/// - **逻辑（How）**：构造时校验实体非空，随后包装一个状态码固定为 412 的
///   [`NegotiatedContentResult`]，执行时原样委托给它；
/// - **契约（What）**：
///   - 实体序列化为 JSON `null`（例如 `None`）时构造失败，返回
///     [`ODataError::ArgumentNull`]，且不会触达协商器；
///   - 访问器返回构造时提供的同一批协作者；
///   - 协商失败时的 406 由内层结果产生，本类型不做额外处理。
pub struct ConflictedResult<T> {
    inner: NegotiatedContentResult<T>,
}

impl<T: Serialize> ConflictedResult<T> {
    /// 从请求处理器上下文构造。
    pub fn from_controller(entity: T, controller: &ControllerContext) -> Result<Self, ODataError> {
        let entity = check_null(entity)?;
        Ok(Self {
            inner: NegotiatedContentResult::from_controller(
                StatusCode::PRECONDITION_FAILED,
                entity,
                controller,
            ),
        })
    }

    /// 以显式的协商器、请求与格式化器构造。
    pub fn new(
        entity: T,
        negotiator: Arc<dyn ContentNegotiator>,
        request: Arc<Request<Bytes>>,
        formatters: FormatterCollection,
    ) -> Result<Self, ODataError> {
        let entity = check_null(entity)?;
        Ok(Self {
            inner: NegotiatedContentResult::new(
                StatusCode::PRECONDITION_FAILED,
                entity,
                negotiator,
                request,
                formatters,
            ),
        })
    }
}

impl<T> ConflictedResult<T> {
    pub fn entity(&self) -> &T {
        self.inner.content()
    }

    pub fn content_negotiator(&self) -> &Arc<dyn ContentNegotiator> {
        self.inner.content_negotiator()
    }

    pub fn request(&self) -> &Arc<Request<Bytes>> {
        self.inner.request()
    }

    pub fn formatters(&self) -> &FormatterCollection {
        self.inner.formatters()
    }

    /// 内层的协商结果，状态码恒为 412。
    pub fn inner_result(&self) -> &NegotiatedContentResult<T> {
        &self.inner
    }
}

impl<T> fmt::Debug for ConflictedResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictedResult")
            .field("inner", &self.inner)
            .finish()
    }
}

#[async_trait]
impl<T> ActionResult for ConflictedResult<T>
where
    T: Serialize + Send + Sync,
{
    async fn execute(&self, cancellation: &Cancellation) -> Result<Response<Bytes>, ODataError> {
        self.inner.execute(cancellation).await
    }
}

fn check_null<T: Serialize>(entity: T) -> Result<T, ODataError> {
    if serde_json::to_value(&entity)?.is_null() {
        return Err(ODataError::ArgumentNull { name: "entity" });
    }
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::FormattingServices;

    fn context() -> ControllerContext {
        let request = Request::builder()
            .uri("/odata/Orders(7)")
            .body(Bytes::new())
            .expect("请求应可构造");
        ControllerContext::new(Arc::new(request), FormattingServices::default())
    }

    #[test]
    fn none_entity_is_rejected() {
        let err = ConflictedResult::<Option<u32>>::from_controller(None, &context())
            .expect_err("空实体应被拒绝");
        assert!(matches!(err, ODataError::ArgumentNull { name: "entity" }));
    }

    #[test]
    fn inner_result_carries_precondition_failed() {
        let result = ConflictedResult::from_controller(Some(7_u32), &context()).expect("实体非空");
        assert_eq!(result.inner_result().status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(result.entity(), &Some(7));
    }
}
