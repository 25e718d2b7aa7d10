//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义 OData 核心契约对外暴露的错误语义：参数校验、序列化、取消、格式化与配置解析；
//! - 每个变体提供稳定错误码（`odata.*`），便于宿主映射告警与指标，而无需匹配自然语言描述。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 [`thiserror::Error`]，兼容 `std::error::Error` 生态；
//! - 参数错误同步返回且不可重试；Domain 模型加载失败原样向上传播。

use thiserror::Error;

/// 参数为空时使用的稳定错误码。
pub const CODE_ARGUMENT_NULL: &str = "odata.argument.null";

/// OData 核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合冲突响应构造、内容协商执行与配置加载路径上的失败，
///   让调用方可以用 `?` 直接传播；
/// - **契约 (What)**：
///   - [`ODataError::ArgumentNull`] 在任何协商发生之前同步返回；
///   - [`ODataError::Cancelled`] 表示执行被取消信号打断，调用方不得使用半成品响应；
///   - 其余变体保留底层错误作为 `source`。
#[derive(Debug, Error)]
pub enum ODataError {
    /// 必填参数为空。
    #[error("argument `{name}` must not be null")]
    ArgumentNull { name: &'static str },

    /// 响应内容无法序列化为中间表示。
    #[error("failed to serialize response content: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 执行过程中收到取消信号。
    #[error("operation cancelled during `{stage}`")]
    Cancelled { stage: &'static str },

    /// 格式化器写出响应体失败。
    #[error("formatter for `{media_type}` failed: {detail}")]
    FormatterWrite { media_type: String, detail: String },

    /// 配置文本无法解析。
    #[error("invalid OData settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// 传输层响应报文构造失败。
    #[error("failed to build response message: {0}")]
    Response(#[from] http::Error),
}

impl ODataError {
    /// 返回稳定的错误码。
    pub fn code(&self) -> &'static str {
        match self {
            ODataError::ArgumentNull { .. } => CODE_ARGUMENT_NULL,
            ODataError::Serialization(_) => "odata.content.serialization",
            ODataError::Cancelled { .. } => "odata.execution.cancelled",
            ODataError::FormatterWrite { .. } => "odata.formatter.write",
            ODataError::Settings(_) => "odata.settings.invalid",
            ODataError::Response(_) => "odata.response.build",
        }
    }
}

/// Domain 数据源错误。
///
/// - **意图 (Why)**：模型加载失败是路由注册的致命错误，需要保持原始上下文向上传播；
/// - **契约 (What)**：注册器不会重试，也不会改写该错误。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// 实体数据模型加载失败。
    #[error("entity data model could not be loaded: {detail}")]
    ModelLoad { detail: String },

    /// 数据源内部异常。
    #[error("domain failure: {detail}")]
    Internal { detail: String },
}

impl DomainError {
    /// 便捷构造模型加载失败。
    pub fn model_load(detail: impl Into<String>) -> Self {
        DomainError::ModelLoad {
            detail: detail.into(),
        }
    }

    /// 返回稳定的错误码。
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::ModelLoad { .. } => "odata.domain.model_load",
            DomainError::Internal { .. } => "odata.domain.internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            ODataError::ArgumentNull { name: "entity" }.code(),
            "odata.argument.null"
        );
        assert_eq!(
            ODataError::Cancelled { stage: "negotiate" }.code(),
            "odata.execution.cancelled"
        );
        assert_eq!(DomainError::model_load("boom").code(), "odata.domain.model_load");
    }

    #[test]
    fn argument_null_names_the_parameter() {
        let err = ODataError::ArgumentNull { name: "entity" };
        assert_eq!(err.to_string(), "argument `entity` must not be null");
    }
}
