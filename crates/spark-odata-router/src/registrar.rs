//! Domain 路由注册器。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主只需提供路由名、前缀与获取 Domain 的方式，即可得到一条与模型、约定列表完整装配的
//!   OData 路由，并可选地挂载批处理端点；
//! - **逻辑（How）**：[`DomainRouteBuilder::map`] 依次执行：
//!   1. 校验 Domain 工厂存在；
//!   2. 规范化前缀（至多去掉一个尾部 `/`）；
//!   3. 通过工厂取得 Domain，异步加载模型，加载结束后立即释放 Domain；
//!   4. 装配约定列表；
//!   5. 配置批处理处理器并登记 `{路由名}Batch` 路由；
//!   6. 创建路径解析器并尝试兼容补丁；
//!   7. 构造路由约束与路由，登记到路由表并返回；
//! - **契约（What）**：只有缺少工厂、模型加载失败与路由名重复会让注册失败；前两者发生时路由表保持不变，
//!   第三者发生时已登记的批处理路由不回滚。

use std::{fmt, sync::Arc};

use spark_odata_core::{DomainController, DomainFactory};

use crate::{
    batch::BatchHandler,
    config::HttpConfiguration,
    convention::create_domain_routing_conventions,
    error::RegistrationError,
    path::apply_resolver_patch,
    route::{ODataPathRouteConstraint, ODataRoute},
};

/// 批处理路径的固定后缀。
pub const BATCH_SEGMENT: &str = "$batch";

/// 批处理路由名的后缀。
pub const BATCH_ROUTE_SUFFIX: &str = "Batch";

/// 去掉至多一个尾部 `/`；空字符串原样返回。
pub fn remove_trailing_slash(prefix: &str) -> &str {
    prefix.strip_suffix('/').unwrap_or(prefix)
}

/// 按规范化后的前缀计算批处理路径模板。
pub fn batch_template(prefix: &str) -> String {
    if prefix.is_empty() {
        BATCH_SEGMENT.to_owned()
    } else {
        format!("{prefix}/{BATCH_SEGMENT}")
    }
}

/// 一次 Domain 路由注册的参数。
pub struct DomainRouteBuilder {
    route_name: String,
    route_prefix: String,
    controller_name: String,
    domain_factory: Option<DomainFactory>,
    batch_handler: Option<Arc<BatchHandler>>,
}

impl DomainRouteBuilder {
    pub fn new(route_name: impl Into<String>, controller_name: impl Into<String>) -> Self {
        Self {
            route_name: route_name.into(),
            route_prefix: String::new(),
            controller_name: controller_name.into(),
            domain_factory: None,
            batch_handler: None,
        }
    }

    /// 以控制器类型名与其 Domain 作为兜底控制器与工厂。
    pub fn for_controller<C: DomainController>(route_name: impl Into<String>) -> Self {
        Self::new(route_name, C::NAME).domain_factory(C::domain_factory())
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    pub fn domain_factory(mut self, factory: DomainFactory) -> Self {
        self.domain_factory = Some(factory);
        self
    }

    pub fn batch_handler(mut self, handler: Arc<BatchHandler>) -> Self {
        self.batch_handler = Some(handler);
        self
    }

    /// 执行注册并返回已登记的路由。
    pub async fn map(self, config: &HttpConfiguration) -> Result<Arc<ODataRoute>, RegistrationError> {
        let factory = self
            .domain_factory
            .ok_or(RegistrationError::MissingDomainFactory)?;
        let route_name = self.route_name;
        let prefix = remove_trailing_slash(&self.route_prefix).to_owned();
        tracing::info!(
            route = %route_name,
            prefix = %prefix,
            controller = %self.controller_name,
            "registering domain route"
        );

        let domain = factory();
        let loaded = domain.model().await;
        drop(domain);
        let model = loaded.map_err(|err| {
            tracing::warn!(
                route = %route_name,
                code = err.code(),
                error = %err,
                "domain model load failed, route not registered"
            );
            RegistrationError::ModelLoad(err)
        })?;

        let conventions =
            create_domain_routing_conventions(config, Arc::clone(&model), &self.controller_name);

        if let Some(handler) = self.batch_handler {
            handler.set_domain_factory_if_unset(Arc::clone(&factory));
            handler.bind_route_name(route_name.as_str());
            let template = batch_template(&prefix);
            config.routes().add_batch_route(
                format!("{route_name}{BATCH_ROUTE_SUFFIX}"),
                template.as_str(),
                handler,
            )?;
            tracing::info!(route = %route_name, template = %template, "batch route registered");
        }

        let path_handler = config.create_path_handler();
        let outcome = apply_resolver_patch(path_handler.as_ref(), config.resolver_settings());
        tracing::debug!(route = %route_name, ?outcome, "resolver settings compatibility patch");

        let constraint = ODataPathRouteConstraint::new(
            path_handler,
            model,
            route_name.as_str(),
            conventions,
            Arc::clone(config.catalog()),
        );
        let route = Arc::new(ODataRoute::new(prefix, constraint));
        config
            .routes()
            .add_route(route_name.as_str(), Arc::clone(&route))?;
        tracing::info!(route = %route_name, prefix = %route.prefix(), "domain route registered");
        Ok(route)
    }
}

impl fmt::Debug for DomainRouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainRouteBuilder")
            .field("route_name", &self.route_name)
            .field("route_prefix", &self.route_prefix)
            .field("controller_name", &self.controller_name)
            .field("has_domain_factory", &self.domain_factory.is_some())
            .field("batch_handler", &self.batch_handler)
            .finish()
    }
}

/// 以显式 Domain 工厂注册路由，兜底约定绑定到控制器类型 `C`。
///
/// `domain_factory` 为 `None` 时返回 [`RegistrationError::MissingDomainFactory`]。
pub async fn map_domain_route<C: DomainController>(
    config: &HttpConfiguration,
    route_name: &str,
    route_prefix: &str,
    domain_factory: Option<DomainFactory>,
    batch_handler: Option<Arc<BatchHandler>>,
) -> Result<Arc<ODataRoute>, RegistrationError> {
    let mut builder = DomainRouteBuilder::new(route_name, C::NAME).prefix(route_prefix);
    builder.domain_factory = domain_factory;
    builder.batch_handler = batch_handler;
    builder.map(config).await
}

/// 以控制器类型 `C` 的 Domain 作为工厂注册路由。
pub async fn map_domain_route_for<C: DomainController>(
    config: &HttpConfiguration,
    route_name: &str,
    route_prefix: &str,
    batch_handler: Option<Arc<BatchHandler>>,
) -> Result<Arc<ODataRoute>, RegistrationError> {
    map_domain_route::<C>(
        config,
        route_name,
        route_prefix,
        Some(C::domain_factory()),
        batch_handler,
    )
    .await
}
