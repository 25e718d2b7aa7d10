//! 批处理处理器。
//!
//! # 教案式说明
//! - **意图（Why）**：批处理端点在一次传输层调用中携带多个逻辑请求，每个子请求都要经由绑定的 OData 路由
//!   解析，执行时还需要一个 Domain 实例；
//! - **逻辑（How）**：Domain 工厂保存在 [`OnceLock`] 中，首个写入者生效，之后的写入全部被忽略；
//!   路由名绑定保存在 [`ArcSwapOption`] 中，每次注册都会覆盖为最新的路由名；
//! - **契约（What）**：一个处理器可以被多条路由共享；并发注册时工厂由最先完成写入的注册决定。

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use http::{Method, Request};
use serde::Deserialize;
use spark_odata_core::{Domain, DomainFactory};

use crate::{
    error::BatchError,
    route::{RouteMatch, RouteTable},
};

/// JSON 批处理请求体：`{"requests": [{"id": "1", "method": "GET", "url": "Products(1)"}]}`。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchOperation>,
}

impl BatchRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, BatchError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// 批处理中的单个子请求。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BatchOperation {
    pub id: String,
    pub method: String,
    pub url: String,
}

/// 子请求的分发结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Matched { id: String, route_match: RouteMatch },
    NotFound { id: String },
    InvalidMethod { id: String, method: String },
}

impl BatchOutcome {
    pub fn id(&self) -> &str {
        match self {
            BatchOutcome::Matched { id, .. }
            | BatchOutcome::NotFound { id }
            | BatchOutcome::InvalidMethod { id, .. } => id,
        }
    }
}

#[derive(Default)]
pub struct BatchHandler {
    domain_factory: OnceLock<DomainFactory>,
    route_name: ArcSwapOption<String>,
}

impl BatchHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预先确定的 Domain 工厂创建处理器，注册器不会再覆盖它。
    pub fn with_domain_factory(factory: DomainFactory) -> Self {
        let handler = Self::new();
        handler.set_domain_factory_if_unset(factory);
        handler
    }

    pub fn domain_factory(&self) -> Option<&DomainFactory> {
        self.domain_factory.get()
    }

    /// 仅在尚未设置时写入工厂；返回本次调用是否生效。
    pub fn set_domain_factory_if_unset(&self, factory: DomainFactory) -> bool {
        self.domain_factory.set(factory).is_ok()
    }

    pub fn bind_route_name(&self, name: impl Into<String>) {
        self.route_name.store(Some(Arc::new(name.into())));
    }

    pub fn route_name(&self) -> Option<Arc<String>> {
        self.route_name.load_full()
    }

    /// 为一次批处理执行创建 Domain 实例。
    pub fn create_domain(&self) -> Result<Box<dyn Domain>, BatchError> {
        let factory = self
            .domain_factory
            .get()
            .ok_or(BatchError::MissingDomainFactory)?;
        Ok(factory())
    }

    /// 解析 JSON 批处理请求体。
    pub fn parse_request(request: &Request<Bytes>) -> Result<BatchRequest, BatchError> {
        BatchRequest::from_slice(request.body())
    }

    /// 通过绑定的 OData 路由解析每个子请求。
    ///
    /// - 以 `/` 开头或带有协议主机的 URL 视为完整路径，需包含路由前缀；
    /// - 其余 URL 相对于服务根解析；
    /// - 单个子请求的失败体现在对应的 [`BatchOutcome`] 中，不影响其余子请求。
    pub fn dispatch(
        &self,
        routes: &RouteTable,
        batch: &BatchRequest,
    ) -> Result<Vec<BatchOutcome>, BatchError> {
        let name = self.route_name().ok_or(BatchError::UnboundRouteName)?;
        let route = routes
            .odata_route(&name)
            .ok_or_else(|| BatchError::RouteMissing {
                name: name.to_string(),
            })?;

        let outcomes = batch
            .requests
            .iter()
            .map(|operation| {
                let id = operation.id.clone();
                let Ok(method) = Method::from_bytes(operation.method.as_bytes()) else {
                    return BatchOutcome::InvalidMethod {
                        id,
                        method: operation.method.clone(),
                    };
                };

                let url = strip_authority(&operation.url);
                let url = url.split(['?', '#']).next().unwrap_or_default();
                let matched = if url.starts_with('/') {
                    route.resolve(&method, url)
                } else {
                    route.constraint().resolve(&method, url)
                };

                tracing::debug!(
                    route = %name,
                    id = %id,
                    %method,
                    url,
                    matched = matched.is_some(),
                    "dispatched batch operation"
                );
                match matched {
                    Some(route_match) => BatchOutcome::Matched { id, route_match },
                    None => BatchOutcome::NotFound { id },
                }
            })
            .collect();
        Ok(outcomes)
    }
}

impl fmt::Debug for BatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandler")
            .field("has_domain_factory", &self.domain_factory.get().is_some())
            .field("route_name", &self.route_name())
            .finish()
    }
}

/// 去掉 `scheme://host` 部分，保留以 `/` 开头的路径。
fn strip_authority(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |index| &rest[index..]),
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_odata_core::{EdmModel, StaticDomain, domain_factory};

    fn factory(namespace: &'static str) -> DomainFactory {
        domain_factory(move || {
            Box::new(StaticDomain::new(Arc::new(EdmModel::builder(namespace).build())))
                as Box<dyn Domain>
        })
    }

    #[tokio::test]
    async fn first_factory_wins() {
        let handler = BatchHandler::new();
        assert!(handler.set_domain_factory_if_unset(factory("First")));
        assert!(!handler.set_domain_factory_if_unset(factory("Second")));

        let domain = handler.create_domain().expect("工厂已设置");
        let model = domain.model().await.expect("静态模型");
        assert_eq!(model.namespace(), "First");
    }

    #[test]
    fn route_name_binding_is_overwritten() {
        let handler = BatchHandler::new();
        assert!(handler.route_name().is_none());
        handler.bind_route_name("first");
        handler.bind_route_name("second");
        assert_eq!(handler.route_name().as_deref().map(String::as_str), Some("second"));
    }

    #[test]
    fn unconfigured_handler_reports_errors() {
        let handler = BatchHandler::new();
        assert_eq!(
            handler.create_domain().err(),
            Some(BatchError::MissingDomainFactory)
        );
        let batch = BatchRequest { requests: vec![] };
        assert_eq!(
            handler.dispatch(&RouteTable::new(), &batch),
            Err(BatchError::UnboundRouteName)
        );
        handler.bind_route_name("odata");
        assert_eq!(
            handler.dispatch(&RouteTable::new(), &batch),
            Err(BatchError::RouteMissing {
                name: "odata".to_owned()
            })
        );
    }

    #[test]
    fn parses_json_payload() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/odata/$batch")
            .body(Bytes::from_static(
                br#"{"requests":[{"id":"1","method":"GET","url":"Products(1)"}]}"#,
            ))
            .expect("请求应可构造");
        let batch = BatchHandler::parse_request(&request).expect("合法 JSON");
        assert_eq!(batch.requests.len(), 1);
        assert_eq!(batch.requests[0].url, "Products(1)");

        let err = BatchRequest::from_slice(b"{").expect_err("非法 JSON");
        assert_eq!(err.code(), "odata.batch.malformed");
    }

    #[test]
    fn strips_scheme_and_host() {
        assert_eq!(strip_authority("https://host/odata/Products"), "/odata/Products");
        assert_eq!(strip_authority("https://host"), "/");
        assert_eq!(strip_authority("Products(1)"), "Products(1)");
    }
}
