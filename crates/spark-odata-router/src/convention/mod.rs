//! 路由约定与约定列表装配。
//!
//! # 教案式说明
//! - **意图（Why）**：每个路由对应一张有序的约定列表，请求路径依次交给列表中的约定尝试，首个命中者决定
//!   控制器与动作；
//! - **逻辑（How）**：[`create_domain_routing_conventions`] 以平台默认列表为基线，把 Domain 兜底约定插入到
//!   首个“未映射”约定之前（缺失时追加到末尾），再把特性路由约定插入到最前；
//! - **契约（What）**：结果顺序恒为 `[特性路由, ...平台默认..., Domain 兜底, 未映射]`，长度为平台默认长度加二。

mod attribute;
mod catalog;
mod fallback;
mod platform;

use std::{collections::BTreeMap, fmt, sync::Arc};

use http::Method;
use spark_odata_core::{DomainController, EdmModel};

use crate::{config::HttpConfiguration, path::ODataPath};

pub use attribute::{AttributeRoute, AttributeRoutingConvention};
pub use catalog::ControllerCatalog;
pub use fallback::DefaultDomainRoutingConvention;
pub use platform::{PlatformConvention, UnmappedRequestRoutingConvention, platform_default_conventions};

/// 约定种类，用于在列表中定位特定约定。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConventionKind {
    Attribute,
    Metadata,
    EntitySet,
    Singleton,
    Entity,
    Navigation,
    Property,
    Function,
    Action,
    DomainFallback,
    Unmapped,
}

/// 一次匹配尝试的输入。
#[derive(Clone, Copy, Debug)]
pub struct RoutingRequest<'a> {
    pub method: &'a Method,
    pub path: &'a ODataPath,
    pub catalog: &'a ControllerCatalog,
}

/// 约定命中后选出的控制器、动作与路由值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSelection {
    pub convention: ConventionKind,
    pub controller: String,
    pub action: String,
    pub values: BTreeMap<String, String>,
}

impl RouteSelection {
    pub fn new(
        convention: ConventionKind,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            convention,
            controller: controller.into(),
            action: action.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// 把路径中的主键写入 `key` 与 `relatedKey`。
    pub fn with_path_keys(mut self, path: &ODataPath) -> Self {
        for (name, value) in ["key", "relatedKey"].into_iter().zip(path.keys()) {
            self.values.insert(name.to_owned(), value.to_owned());
        }
        self
    }
}

/// 路由约定：尝试把已解析路径映射到控制器与动作。
///
/// - `select` 返回 `None` 表示“本约定不处理”，由列表中的下一个约定继续尝试；
/// - 实现需满足 `Send + Sync`，同一列表会被路由约束跨请求共享。
pub trait RoutingConvention: Send + Sync + fmt::Debug {
    fn kind(&self) -> ConventionKind;

    fn select(&self, request: &RoutingRequest<'_>) -> Option<RouteSelection>;
}

/// 有序约定列表。
pub type ConventionList = Vec<Arc<dyn RoutingConvention>>;

/// 为绑定到 `controller_name` 的 Domain 路由装配约定列表。
///
/// # 教案式说明
/// - **逻辑（How）**：
///   1. 从宿主配置取得平台默认列表；
///   2. 找到首个 [`ConventionKind::Unmapped`] 的位置，缺失时取列表末尾；
///   3. 在该位置插入 [`DefaultDomainRoutingConvention`]；
///   4. 在位置 0 插入 [`AttributeRoutingConvention`]。
/// - **契约（What）**：多个未映射约定并存时只以第一个为锚点。
pub fn create_domain_routing_conventions(
    config: &HttpConfiguration,
    model: Arc<EdmModel>,
    controller_name: &str,
) -> ConventionList {
    let mut conventions = config.platform_default_conventions();
    let index = conventions
        .iter()
        .position(|convention| convention.kind() == ConventionKind::Unmapped)
        .unwrap_or(conventions.len());

    conventions.insert(
        index,
        Arc::new(DefaultDomainRoutingConvention::new(
            controller_name,
            Arc::clone(&model),
        )),
    );
    conventions.insert(0, Arc::new(AttributeRoutingConvention::new(&model, config)));
    conventions
}

/// 以控制器类型名作为兜底控制器装配约定列表。
pub fn create_domain_routing_conventions_for<C: DomainController>(
    config: &HttpConfiguration,
    model: Arc<EdmModel>,
) -> ConventionList {
    create_domain_routing_conventions(config, model, C::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug)]
    struct Marker(ConventionKind);

    impl RoutingConvention for Marker {
        fn kind(&self) -> ConventionKind {
            self.0
        }

        fn select(&self, _request: &RoutingRequest<'_>) -> Option<RouteSelection> {
            None
        }
    }

    fn kinds(conventions: &ConventionList) -> Vec<ConventionKind> {
        conventions.iter().map(|convention| convention.kind()).collect()
    }

    fn config_with(defaults: Vec<ConventionKind>) -> HttpConfiguration {
        HttpConfiguration::new().with_platform_conventions(move || {
            defaults
                .iter()
                .map(|kind| Arc::new(Marker(*kind)) as Arc<dyn RoutingConvention>)
                .collect()
        })
    }

    fn model() -> Arc<EdmModel> {
        Arc::new(EdmModel::builder("Shop").build())
    }

    #[test]
    fn fallback_precedes_the_terminal_unmapped_convention() {
        let config = HttpConfiguration::new();
        let defaults = config.platform_default_conventions().len();
        let conventions = create_domain_routing_conventions(&config, model(), "ShopController");

        let kinds = kinds(&conventions);
        assert_eq!(kinds.len(), defaults + 2);
        assert_eq!(kinds[0], ConventionKind::Attribute);
        assert_eq!(kinds[kinds.len() - 2], ConventionKind::DomainFallback);
        assert_eq!(kinds[kinds.len() - 1], ConventionKind::Unmapped);
    }

    #[test]
    fn fallback_is_appended_when_unmapped_is_absent() {
        let config = config_with(vec![ConventionKind::Metadata, ConventionKind::EntitySet]);
        let conventions = create_domain_routing_conventions(&config, model(), "ShopController");
        assert_eq!(
            kinds(&conventions),
            vec![
                ConventionKind::Attribute,
                ConventionKind::Metadata,
                ConventionKind::EntitySet,
                ConventionKind::DomainFallback,
            ]
        );
    }

    #[test]
    fn only_the_first_unmapped_is_used_as_anchor() {
        let config = config_with(vec![
            ConventionKind::Unmapped,
            ConventionKind::Metadata,
            ConventionKind::Unmapped,
        ]);
        let conventions = create_domain_routing_conventions(&config, model(), "ShopController");
        assert_eq!(
            kinds(&conventions),
            vec![
                ConventionKind::Attribute,
                ConventionKind::DomainFallback,
                ConventionKind::Unmapped,
                ConventionKind::Metadata,
                ConventionKind::Unmapped,
            ]
        );
    }

    fn kind_strategy() -> impl Strategy<Value = ConventionKind> {
        prop_oneof![
            Just(ConventionKind::Metadata),
            Just(ConventionKind::EntitySet),
            Just(ConventionKind::Entity),
            Just(ConventionKind::Navigation),
            Just(ConventionKind::Function),
            Just(ConventionKind::Unmapped),
        ]
    }

    proptest! {
        #[test]
        fn assembled_list_keeps_the_ordering_invariant(
            defaults in proptest::collection::vec(kind_strategy(), 0..12)
        ) {
            let anchor = defaults
                .iter()
                .position(|kind| *kind == ConventionKind::Unmapped)
                .unwrap_or(defaults.len());
            let config = config_with(defaults.clone());
            let assembled = kinds(&create_domain_routing_conventions(&config, model(), "ShopController"));

            prop_assert_eq!(assembled.len(), defaults.len() + 2);
            prop_assert_eq!(assembled[0], ConventionKind::Attribute);
            prop_assert_eq!(assembled[anchor + 1], ConventionKind::DomainFallback);
            prop_assert_eq!(&assembled[1..anchor + 1], &defaults[..anchor]);
            prop_assert_eq!(&assembled[anchor + 2..], &defaults[anchor..]);
        }
    }
}
