//! 媒体类型与格式化器。
//!
//! # 教案式说明
//! - **意图（Why）**：参考 HTTP `Accept`/`Content-Type` 语义，为内容协商提供可比较的媒体类型，
//!   以及“把候选响应体写成字节”的格式化器抽象；
//! - **逻辑（How）**：响应体先统一序列化为 `serde_json::Value` 中间表示，格式化器只面对该表示，
//!   从而无需了解泛型实体类型；
//! - **契约（What）**：[`FormatterCollection`] 保持注册顺序，协商回落时按该顺序选择首个可写格式化器。

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::{contract::Cancellation, error::ODataError};

/// 结构化的媒体类型，例如 `application/json;odata.metadata=minimal`。
///
/// - 类型、子类型与参数名统一转为小写；参数值去除引号后保留原样；
/// - `*` 可出现在类型或子类型位置，用于表达 `Accept` 中的范围。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaType {
    kind: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            kind: kind.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// 追加参数。
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// 解析媒体类型文本；格式非法时返回 `None`。
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut media_type = MediaType::new(kind, subtype);
        for parameter in parts {
            let parameter = parameter.trim();
            if parameter.is_empty() {
                continue;
            }
            let (name, value) = parameter.split_once('=')?;
            let value = value.trim().trim_matches('"');
            media_type = media_type.with_parameter(name.trim(), value);
        }
        Some(media_type)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// 按名称读取参数（名称大小写不敏感）。
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// 判断具体媒体类型是否落在 `range` 范围内。
    ///
    /// - 类型/子类型相同或 `range` 使用 `*` 通配；
    /// - `range` 中除 `q` 外的每个参数都必须以相同取值（大小写不敏感）出现在 `self` 中。
    pub fn matches(&self, range: &MediaType) -> bool {
        let kind_matches = range.kind == "*" || range.kind == self.kind;
        let subtype_matches = range.subtype == "*" || range.subtype == self.subtype;
        if !(kind_matches && subtype_matches) {
            return false;
        }

        range
            .parameters
            .iter()
            .filter(|(name, _)| name != "q")
            .all(|(name, value)| {
                self.parameter(name)
                    .is_some_and(|own| own.eq_ignore_ascii_case(value))
            })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

/// `MediaTypeFormatter` 把协商选定的响应体写成字节。
///
/// # 契约说明（What）
/// - `supported_media_types` 按优先级排列，首项作为回落时的默认响应类型；
/// - `write` 必须尊重取消信号：若在写出前已取消，返回 [`ODataError::Cancelled`]；
/// - 实现需满足 `Send + Sync`，以便格式化器集合跨请求共享。
#[async_trait]
pub trait MediaTypeFormatter: Send + Sync + fmt::Debug {
    /// 支持的媒体类型列表。
    fn supported_media_types(&self) -> &[MediaType];

    /// 是否能够写出给定内容。
    fn can_write(&self, _content: &Value) -> bool {
        true
    }

    /// 以 `media_type` 写出 `content`。
    async fn write(
        &self,
        content: &Value,
        media_type: &MediaType,
        cancellation: &Cancellation,
    ) -> Result<Bytes, ODataError>;
}

/// 以 `serde_json` 写出 JSON 的格式化器。
///
/// 支持的媒体类型依次为 OData JSON 的三种元数据级别以及普通 `application/json`。
#[derive(Debug)]
pub struct JsonMediaTypeFormatter {
    media_types: Vec<MediaType>,
    indent: bool,
}

impl JsonMediaTypeFormatter {
    pub fn new() -> Self {
        let odata = |level: &str| {
            MediaType::new("application", "json").with_parameter("odata.metadata", level)
        };
        Self {
            media_types: vec![
                odata("minimal"),
                odata("full"),
                odata("none"),
                MediaType::new("application", "json"),
            ],
            indent: false,
        }
    }

    /// 以缩进格式输出，便于调试。
    pub fn indented(mut self) -> Self {
        self.indent = true;
        self
    }
}

impl Default for JsonMediaTypeFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTypeFormatter for JsonMediaTypeFormatter {
    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    async fn write(
        &self,
        content: &Value,
        media_type: &MediaType,
        cancellation: &Cancellation,
    ) -> Result<Bytes, ODataError> {
        cancellation.check("format")?;
        let encoded = if self.indent {
            serde_json::to_vec_pretty(content)
        } else {
            serde_json::to_vec(content)
        };
        encoded
            .map(Bytes::from)
            .map_err(|err| ODataError::FormatterWrite {
                media_type: media_type.to_string(),
                detail: err.to_string(),
            })
    }
}

/// 有序的格式化器集合，克隆成本为一次引用计数。
#[derive(Clone, Debug, Default)]
pub struct FormatterCollection {
    formatters: Arc<[Arc<dyn MediaTypeFormatter>]>,
}

impl FormatterCollection {
    pub fn new(formatters: Vec<Arc<dyn MediaTypeFormatter>>) -> Self {
        Self {
            formatters: formatters.into(),
        }
    }

    /// 仅包含 [`JsonMediaTypeFormatter`] 的默认集合。
    pub fn json() -> Self {
        Self::new(vec![Arc::new(JsonMediaTypeFormatter::new())])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn MediaTypeFormatter>> {
        self.formatters.iter()
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// 判断两个集合是否共享同一底层存储。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.formatters, &other.formatters)
    }
}
