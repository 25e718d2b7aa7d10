#![deny(unsafe_code)]
#![doc = "spark-odata-router: OData 路由约定装配、路由表与 Domain 路由注册器。"]

//! # spark-odata-router
//!
//! ## 定位与职责（Why）
//! - 把以 Domain 为后端的 OData 服务挂载到宿主路由表：一次注册得到一条与模型、约定列表完整装配的路由，
//!   以及可选的 `$batch` 端点；
//! - 约定列表顺序固定为“特性路由 → 平台默认 → Domain 兜底 → 未映射”，具体者优先。
//!
//! ## 架构嵌入（Where）
//! - 依赖 `spark-odata-core` 提供的 [`spark_odata_core::EdmModel`]、[`spark_odata_core::Domain`]
//!   与 [`spark_odata_core::ResolverSettings`]；
//! - 宿主持有 [`HttpConfiguration`]，启动阶段调用 [`map_domain_route`] 或 [`map_domain_route_for`]，
//!   运行阶段通过 [`RouteTable::resolve`] 把请求分派到控制器动作。
//!
//! ## 并发模型（How）
//! - 注册只在模型加载处挂起，多条注册可以并发进行；
//! - 共享的 [`BatchHandler`] 以“首个写入者生效”的方式记录 Domain 工厂。

pub mod batch;
pub mod config;
pub mod convention;
pub mod error;
pub mod path;
pub mod registrar;
pub mod route;

pub use batch::{BatchHandler, BatchOperation, BatchOutcome, BatchRequest};
pub use config::{ConventionFactory, HttpConfiguration, PathHandlerFactory};
pub use convention::{
    AttributeRoute, AttributeRoutingConvention, ControllerCatalog, ConventionKind, ConventionList,
    DefaultDomainRoutingConvention, PlatformConvention, RouteSelection, RoutingConvention,
    RoutingRequest, UnmappedRequestRoutingConvention, create_domain_routing_conventions,
    create_domain_routing_conventions_for, platform_default_conventions,
};
pub use error::{BatchError, PathError, RegistrationError, RouteTableError};
pub use path::{
    DefaultPathHandler, HasCurrentResolverSlot, HasLegacyResolverSlot, ODataPath, PathHandler,
    PathSegment, ResolverPatchOutcome, ResolverSettingsSlot, apply_resolver_patch,
};
pub use registrar::{
    DomainRouteBuilder, batch_template, map_domain_route, map_domain_route_for,
    remove_trailing_slash,
};
pub use route::{
    BatchRoute, ODataPathRouteConstraint, ODataRoute, RouteEntry, RouteMatch, RouteResolution,
    RouteTable,
};
