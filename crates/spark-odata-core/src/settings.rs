//! OData 服务配置。
//!
//! # 教案式说明
//! - **意图（Why）**：集中描述宿主可调的两组配置：路径解析器的解析选项与内容协商策略；
//! - **逻辑（How）**：全部结构派生 `serde::Deserialize` 并提供 `Default`，可从 TOML 文本加载，
//!   缺失字段回落到默认值；
//! - **契约（What）**：`resolver` 为可选项，缺失时表示“当前平台版本不提供解析器配置”，
//!   路由注册器的兼容补丁会据此跳过。

use serde::{Deserialize, Serialize};

use crate::error::ODataError;

/// 路径解析器的解析选项。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// 实体集、属性与操作名称是否大小写不敏感。
    pub case_insensitive: bool,
    /// 是否允许绑定操作省略命名空间限定。
    pub unqualified_name_call: bool,
    /// 枚举字面量是否允许省略类型前缀。
    ///
    /// 路径中不出现枚举字面量，默认路径解析器不读取该项；它只随兼容补丁原样写入解析器槽位，
    /// 供能解析查询选项的解析器使用。
    pub enum_prefix_free: bool,
}

/// 内容协商策略。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationSettings {
    /// 为 `true` 时，`Accept` 无法匹配即返回 406，而不回落到首个可写格式化器。
    pub exclude_match_on_type_only: bool,
}

/// 顶层配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ODataSettings {
    pub resolver: Option<ResolverSettings>,
    pub negotiation: NegotiationSettings,
}

impl ODataSettings {
    /// 从 TOML 文本解析配置。
    pub fn from_toml_str(text: &str) -> Result<Self, ODataError> {
        Ok(toml::from_str(text)?)
    }
}
