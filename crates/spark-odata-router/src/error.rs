//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 汇总路由层的失败语义：路径解析、路由表写入、批处理分发与 Domain 路由注册；
//! - 每个错误枚举提供稳定错误码（`odata.*`），宿主据此映射告警，不依赖自然语言描述。
//!
//! ## 设计要求（What）
//! - 注册阶段只有“缺少 Domain 工厂”“模型加载失败”“路由名重复”三类致命错误；
//! - 兼容补丁未命中不属于错误，以 [`crate::path::ResolverPatchOutcome`] 表达；
//! - 路径解析失败只影响单次匹配，由约束转换为“未命中”。

use spark_odata_core::DomainError;
use thiserror::Error;

/// 请求路径解析错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// 路径中出现空段，例如 `Products//Category`。
    #[error("path `{path}` contains an empty segment")]
    EmptySegment { path: String },

    /// 段名称无法在模型中解析。
    #[error("segment `{segment}` is not defined in the model")]
    UnknownSegment { segment: String },

    /// 主键或参数括号不完整。
    #[error("segment `{segment}` has a malformed key")]
    MalformedKey { segment: String },

    /// 段出现在不允许的位置。
    #[error("segment `{segment}` cannot follow `{after}`")]
    UnexpectedSegment { segment: String, after: String },
}

impl PathError {
    pub fn code(&self) -> &'static str {
        match self {
            PathError::EmptySegment { .. } => "odata.path.empty_segment",
            PathError::UnknownSegment { .. } => "odata.path.unknown_segment",
            PathError::MalformedKey { .. } => "odata.path.malformed_key",
            PathError::UnexpectedSegment { .. } => "odata.path.unexpected_segment",
        }
    }
}

/// 路由表写入错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    /// 同名路由已存在；名称在 OData 路由与批处理路由之间共享同一命名空间。
    #[error("route `{name}` is already registered")]
    DuplicateName { name: String },
}

impl RouteTableError {
    pub fn code(&self) -> &'static str {
        match self {
            RouteTableError::DuplicateName { .. } => "odata.route.duplicate",
        }
    }
}

/// Domain 路由注册错误。
///
/// # 教案式说明
/// - **意图 (Why)**：注册是一次性的启动流程，失败必须让对应路由完全不可达；
/// - **契约 (What)**：
///   - [`RegistrationError::MissingDomainFactory`] 在任何异步步骤之前同步返回；
///   - [`RegistrationError::ModelLoad`] 原样携带 Domain 的错误，注册器不重试；
///   - [`RegistrationError::RouteTable`] 出现时，先前已写入的批处理路由保持原状，不回滚。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// 未提供 Domain 工厂。
    #[error("argument `domain_factory` must not be null")]
    MissingDomainFactory,

    /// Domain 模型加载失败。
    #[error("domain model load failed: {0}")]
    ModelLoad(#[from] DomainError),

    /// 写入路由表失败。
    #[error(transparent)]
    RouteTable(#[from] RouteTableError),
}

impl RegistrationError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::MissingDomainFactory => "odata.argument.null",
            RegistrationError::ModelLoad(inner) => inner.code(),
            RegistrationError::RouteTable(inner) => inner.code(),
        }
    }
}

/// 批处理分发错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// 批处理处理器尚未绑定 OData 路由名。
    #[error("batch handler is not bound to an OData route")]
    UnboundRouteName,

    /// 批处理处理器尚未获得 Domain 工厂。
    #[error("batch handler has no domain factory")]
    MissingDomainFactory,

    /// 绑定的路由名在路由表中不存在。
    #[error("bound OData route `{name}` is not registered")]
    RouteMissing { name: String },

    /// 批处理请求体无法解析。
    #[error("malformed batch payload: {detail}")]
    MalformedPayload { detail: String },
}

impl BatchError {
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::UnboundRouteName => "odata.batch.unbound",
            BatchError::MissingDomainFactory => "odata.batch.missing_factory",
            BatchError::RouteMissing { .. } => "odata.batch.route_missing",
            BatchError::MalformedPayload { .. } => "odata.batch.malformed",
        }
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::MalformedPayload {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_codes_follow_their_source() {
        assert_eq!(
            RegistrationError::MissingDomainFactory.code(),
            "odata.argument.null"
        );
        assert_eq!(
            RegistrationError::from(DomainError::model_load("offline")).code(),
            "odata.domain.model_load"
        );
        let duplicate = RegistrationError::from(RouteTableError::DuplicateName {
            name: "odata".to_owned(),
        });
        assert_eq!(duplicate.code(), "odata.route.duplicate");
        assert_eq!(duplicate.to_string(), "route `odata` is already registered");
    }
}
