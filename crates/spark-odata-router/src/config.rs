//! 宿主侧配置：路由表、格式化服务、解析选项与路由约定的协作者。
//!
//! # 教案式说明
//! - **意图（Why）**：注册器只依赖一个配置对象完成全部装配，宿主通过构建器方法替换其中的协作者
//!   （例如选择不同版本的路径解析器、提供自定义的平台默认约定）；
//! - **逻辑（How）**：除路由表外的字段在构建完成后只读；路由表内部使用读写锁，多个注册调用可共享同一配置；
//! - **契约（What）**：`resolver_settings` 为 `None` 表示宿主平台不提供解析选项，兼容补丁据此跳过。

use std::{fmt, sync::Arc};

use spark_odata_core::{FormattingServices, ODataSettings, ResolverSettings};

use crate::{
    convention::{AttributeRoute, ControllerCatalog, ConventionList, platform_default_conventions},
    path::{DefaultPathHandler, PathHandler},
    route::RouteTable,
};

/// 每次注册创建新的路径解析器。
pub type PathHandlerFactory = Arc<dyn Fn() -> Arc<dyn PathHandler> + Send + Sync>;

/// 每次装配返回新的平台默认约定列表。
pub type ConventionFactory = Arc<dyn Fn() -> ConventionList + Send + Sync>;

pub struct HttpConfiguration {
    routes: RouteTable,
    formatting: FormattingServices,
    resolver_settings: Option<ResolverSettings>,
    catalog: Arc<ControllerCatalog>,
    attribute_routes: Vec<AttributeRoute>,
    path_handler_factory: PathHandlerFactory,
    platform_conventions: ConventionFactory,
}

impl HttpConfiguration {
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            formatting: FormattingServices::default(),
            resolver_settings: None,
            catalog: Arc::new(ControllerCatalog::new()),
            attribute_routes: Vec::new(),
            path_handler_factory: Arc::new(|| Arc::new(DefaultPathHandler::new()) as Arc<dyn PathHandler>),
            platform_conventions: Arc::new(platform_default_conventions),
        }
    }

    /// 以配置文件内容初始化解析选项与格式化服务。
    pub fn from_settings(settings: &ODataSettings) -> Self {
        let mut config = Self::new();
        config.resolver_settings = settings.resolver.clone();
        config.formatting = FormattingServices::from_settings(&settings.negotiation);
        config
    }

    pub fn with_resolver_settings(mut self, settings: ResolverSettings) -> Self {
        self.resolver_settings = Some(settings);
        self
    }

    pub fn with_formatting(mut self, formatting: FormattingServices) -> Self {
        self.formatting = formatting;
        self
    }

    pub fn with_catalog(mut self, catalog: ControllerCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_attribute_route(mut self, route: AttributeRoute) -> Self {
        self.attribute_routes.push(route);
        self
    }

    pub fn with_path_handler_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn PathHandler> + Send + Sync + 'static,
    {
        self.path_handler_factory = Arc::new(factory);
        self
    }

    pub fn with_platform_conventions<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ConventionList + Send + Sync + 'static,
    {
        self.platform_conventions = Arc::new(factory);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn formatting(&self) -> &FormattingServices {
        &self.formatting
    }

    pub fn resolver_settings(&self) -> Option<&ResolverSettings> {
        self.resolver_settings.as_ref()
    }

    pub fn catalog(&self) -> &Arc<ControllerCatalog> {
        &self.catalog
    }

    pub fn attribute_routes(&self) -> &[AttributeRoute] {
        &self.attribute_routes
    }

    pub fn create_path_handler(&self) -> Arc<dyn PathHandler> {
        (self.path_handler_factory)()
    }

    pub fn platform_default_conventions(&self) -> ConventionList {
        (self.platform_conventions)()
    }
}

impl Default for HttpConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HttpConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfiguration")
            .field("routes", &self.routes.len())
            .field("resolver_settings", &self.resolver_settings)
            .field("catalog", &self.catalog)
            .field("attribute_routes", &self.attribute_routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_settings_copies_resolver_and_negotiation() {
        let settings = ODataSettings::from_toml_str(
            r#"
            [resolver]
            case_insensitive = true
            "#,
        )
        .expect("配置应可解析");
        let config = HttpConfiguration::from_settings(&settings);
        assert_eq!(
            config.resolver_settings().map(|resolver| resolver.case_insensitive),
            Some(true)
        );
        assert!(config.routes().is_empty());
        assert!(HttpConfiguration::new().resolver_settings().is_none());
    }

    #[test]
    fn factories_produce_fresh_collaborators() {
        let config = HttpConfiguration::new();
        let first = config.create_path_handler();
        let second = config.create_path_handler();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            config.platform_default_conventions().len(),
            platform_default_conventions().len()
        );
    }
}
