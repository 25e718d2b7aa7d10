#![deny(unsafe_code)]
#![doc = "spark-odata-core: OData 服务的实体模型、Domain 契约、内容协商与并发冲突响应。"]

//! # spark-odata-core
//!
//! ## 定位与职责（Why）
//! - 为 OData 风格的查询服务提供与路由无关的基础契约：实体数据模型（EDM）、Domain 数据源、
//!   内容协商与格式化器；
//! - 提供“乐观并发写入失败”的标准化响应 [`ConflictedResult`]：固定状态码 412，响应体由内容协商决定。
//!
//! ## 架构嵌入（Where）
//! - `spark-odata-router` 依赖本 crate 的 [`EdmModel`]、[`Domain`] 与 [`ResolverSettings`]
//!   完成路由注册；
//! - 写入处理器在并发校验失败时直接构造 [`ConflictedResult`]，交由宿主执行管线生成响应。

pub mod contract;
pub mod domain;
pub mod error;
pub mod formatting;
pub mod model;
pub mod negotiation;
pub mod observability;
pub mod result;
pub mod settings;

pub use contract::Cancellation;
pub use domain::{Domain, DomainController, DomainFactory, StaticDomain, domain_factory};
pub use error::{DomainError, ODataError};
pub use formatting::{FormatterCollection, JsonMediaTypeFormatter, MediaType, MediaTypeFormatter};
pub use model::{
    EdmModel, EdmModelBuilder, EntitySet, EntityType, NavigationProperty, Operation,
    OperationKind, Singleton,
};
pub use negotiation::{
    ContentNegotiator, DefaultContentNegotiator, FormattingServices, NegotiationResult,
};
pub use observability::{TracingInstallError, install_tracing};
pub use result::{ActionResult, ConflictedResult, ControllerContext, NegotiatedContentResult};
pub use settings::{NegotiationSettings, ODataSettings, ResolverSettings};

/// 统一的结果别名，错误类型默认为 [`ODataError`]。
pub type Result<T, E = ODataError> = core::result::Result<T, E>;
