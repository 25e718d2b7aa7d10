//! 已解析的 OData 请求路径。
//!
//! # 教案式说明
//! - **意图（Why）**：路由约定只关心“路径由哪些种类的段组成”，例如 `~/entityset/key/navigation`，
//!   因此解析器先把原始路径转换为带类型的段序列，再交给约定逐一尝试；
//! - **逻辑（How）**：[`PathSegment`] 保存模型中的规范名称；[`ODataPath::template`] 把段序列折叠成
//!   约定使用的模板字符串；
//! - **契约（What）**：空路径表示服务根，模板为 `~`。

mod handler;

use std::fmt;

use spark_odata_core::OperationKind;

pub use handler::{
    DefaultPathHandler, HasCurrentResolverSlot, HasLegacyResolverSlot, PathHandler,
    ResolverPatchOutcome, ResolverSettingsSlot, apply_resolver_patch,
};

/// 路径段。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// `$metadata`
    Metadata,
    /// `$batch`
    Batch,
    EntitySet { name: String, entity_type: String },
    Singleton { name: String, entity_type: String },
    /// 括号内的原始主键文本，例如 `1`、`'abc'` 或 `Id=1`。
    Key { value: String },
    Navigation {
        name: String,
        target_set: String,
        collection: bool,
    },
    Property { name: String },
    /// `$count`
    Count,
    /// `$value`
    Value,
    /// `$ref`
    Ref,
    /// 绑定到前一段实体类型的函数或动作。
    Operation { name: String, kind: OperationKind },
    /// 服务根下的函数或动作导入。
    OperationImport { name: String, kind: OperationKind },
}

impl PathSegment {
    /// 该段在路径模板中的占位名。
    pub fn template_part(&self) -> &'static str {
        match self {
            PathSegment::Metadata => "$metadata",
            PathSegment::Batch => "$batch",
            PathSegment::EntitySet { .. } => "entityset",
            PathSegment::Singleton { .. } => "singleton",
            PathSegment::Key { .. } => "key",
            PathSegment::Navigation { .. } => "navigation",
            PathSegment::Property { .. } => "property",
            PathSegment::Count => "$count",
            PathSegment::Value => "$value",
            PathSegment::Ref => "$ref",
            PathSegment::Operation {
                kind: OperationKind::Function,
                ..
            } => "function",
            PathSegment::Operation {
                kind: OperationKind::Action,
                ..
            } => "action",
            PathSegment::OperationImport {
                kind: OperationKind::Function,
                ..
            } => "unboundfunction",
            PathSegment::OperationImport {
                kind: OperationKind::Action,
                ..
            } => "unboundaction",
        }
    }

    /// 段携带的模型名称；系统段与主键段返回 `None`。
    pub fn name(&self) -> Option<&str> {
        match self {
            PathSegment::EntitySet { name, .. }
            | PathSegment::Singleton { name, .. }
            | PathSegment::Navigation { name, .. }
            | PathSegment::Property { name }
            | PathSegment::Operation { name, .. }
            | PathSegment::OperationImport { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// 由 [`PathSegment`] 组成的有序路径。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ODataPath {
    segments: Vec<PathSegment>,
}

impl ODataPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&PathSegment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// 路径模板，例如 `~/entityset/key/navigation`。
    pub fn template(&self) -> String {
        self.segments
            .iter()
            .fold(String::from("~"), |mut template, segment| {
                template.push('/');
                template.push_str(segment.template_part());
                template
            })
    }

    /// 路径起点的实体集或单例名称，即默认约定选择的控制器名。
    pub fn navigation_source(&self) -> Option<&str> {
        match self.first()? {
            PathSegment::EntitySet { name, .. } | PathSegment::Singleton { name, .. } => Some(name),
            _ => None,
        }
    }

    /// 路径中出现的主键，按出现顺序排列。
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            PathSegment::Key { value } => Some(value.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for ODataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if let PathSegment::Key { value } = segment {
                write!(f, "({value})")?;
                continue;
            }
            if index > 0 {
                f.write_str("/")?;
            }
            match segment.name() {
                Some(name) => f.write_str(name)?,
                None => f.write_str(segment.template_part())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_path() -> ODataPath {
        ODataPath::new(vec![
            PathSegment::EntitySet {
                name: "Products".to_owned(),
                entity_type: "Product".to_owned(),
            },
            PathSegment::Key {
                value: "1".to_owned(),
            },
            PathSegment::Navigation {
                name: "Category".to_owned(),
                target_set: "Categories".to_owned(),
                collection: false,
            },
        ])
    }

    #[test]
    fn template_folds_segment_kinds() {
        assert_eq!(entity_path().template(), "~/entityset/key/navigation");
        assert_eq!(ODataPath::default().template(), "~");
    }

    #[test]
    fn display_renders_keys_in_parentheses() {
        assert_eq!(entity_path().to_string(), "Products(1)/Category");
        let metadata = ODataPath::new(vec![PathSegment::Metadata]);
        assert_eq!(metadata.to_string(), "$metadata");
    }

    #[test]
    fn navigation_source_is_first_named_segment() {
        let path = entity_path();
        assert_eq!(path.navigation_source(), Some("Products"));
        assert_eq!(path.keys().collect::<Vec<_>>(), vec!["1"]);
    }
}
