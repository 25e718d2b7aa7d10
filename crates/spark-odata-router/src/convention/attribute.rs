use std::collections::BTreeMap;

use http::Method;
use spark_odata_core::EdmModel;

use super::{ConventionKind, RouteSelection, RoutingConvention, RoutingRequest};
use crate::{
    config::HttpConfiguration,
    path::{DefaultPathHandler, ODataPath, PathHandler, PathSegment},
};

/// 宿主声明的特性路由：方法与路径模板映射到控制器动作。
///
/// 模板中的主键可以写成 `{name}` 占位符，例如 `Products({key})/Reviews({relatedKey})`，
/// 命中时占位符名称与实际主键写入路由值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeRoute {
    pub method: Method,
    pub template: String,
    pub controller: String,
    pub action: String,
}

impl AttributeRoute {
    pub fn new(
        method: Method,
        template: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            method,
            template: template.into(),
            controller: controller.into(),
            action: action.into(),
        }
    }
}

#[derive(Debug)]
struct CompiledRoute {
    method: Method,
    path: ODataPath,
    controller: String,
    action: String,
}

impl CompiledRoute {
    fn capture(&self, path: &ODataPath) -> Option<BTreeMap<String, String>> {
        if self.path.segments().len() != path.segments().len() {
            return None;
        }

        let mut values = BTreeMap::new();
        for (pattern, actual) in self.path.segments().iter().zip(path.segments()) {
            match (pattern, actual) {
                (PathSegment::Key { value: pattern }, PathSegment::Key { value }) => {
                    match placeholder(pattern) {
                        Some(name) => {
                            values.insert(name.to_owned(), value.clone());
                        }
                        None if pattern == value => {}
                        None => return None,
                    }
                }
                (pattern, actual) if pattern == actual => {}
                _ => return None,
            }
        }
        Some(values)
    }
}

fn placeholder(pattern: &str) -> Option<&str> {
    pattern
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// 特性路由约定，总是位于约定列表首位。
///
/// # 教案式说明
/// - **意图 (Why)**：显式声明的路由比任何通用约定都更具体，必须优先尝试；
/// - **逻辑 (How)**：构造时用宿主的解析选项把每条 [`AttributeRoute`] 的模板解析为 [`ODataPath`]，
///   匹配时逐段比较，主键占位符匹配任意主键；
/// - **契约 (What)**：无法解析的模板在构造时跳过并记录 `warn` 事件，不影响其余特性路由。
#[derive(Debug)]
pub struct AttributeRoutingConvention {
    routes: Vec<CompiledRoute>,
}

impl AttributeRoutingConvention {
    pub fn new(model: &EdmModel, config: &HttpConfiguration) -> Self {
        let handler =
            DefaultPathHandler::with_settings(config.resolver_settings().cloned().unwrap_or_default());
        let routes = config
            .attribute_routes()
            .iter()
            .filter_map(|route| match handler.parse(model, &route.template) {
                Ok(path) => Some(CompiledRoute {
                    method: route.method.clone(),
                    path,
                    controller: route.controller.clone(),
                    action: route.action.clone(),
                }),
                Err(err) => {
                    tracing::warn!(
                        template = %route.template,
                        controller = %route.controller,
                        action = %route.action,
                        code = err.code(),
                        "skipping attribute route with unparsable template"
                    );
                    None
                }
            })
            .collect();
        Self { routes }
    }

    /// 成功编译的特性路由数量。
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RoutingConvention for AttributeRoutingConvention {
    fn kind(&self) -> ConventionKind {
        ConventionKind::Attribute
    }

    fn select(&self, request: &RoutingRequest<'_>) -> Option<RouteSelection> {
        self.routes
            .iter()
            .filter(|route| route.method == *request.method)
            .find_map(|route| {
                let values = route.capture(request.path)?;
                let mut selection =
                    RouteSelection::new(ConventionKind::Attribute, &route.controller, &route.action);
                selection.values = values;
                Some(selection)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::ControllerCatalog;
    use spark_odata_core::EntityType;

    fn model() -> EdmModel {
        EdmModel::builder("Shop")
            .entity_type(
                EntityType::new("Product")
                    .key("Id")
                    .navigation("Reviews", "Reviews", true),
            )
            .entity_type(EntityType::new("Review").key("Id"))
            .entity_set("Products", "Product")
            .entity_set("Reviews", "Review")
            .build()
    }

    fn config() -> HttpConfiguration {
        HttpConfiguration::new()
            .with_attribute_route(AttributeRoute::new(
                Method::GET,
                "Products({id})/Reviews({reviewId})",
                "Reviews",
                "GetProductReview",
            ))
            .with_attribute_route(AttributeRoute::new(
                Method::GET,
                "Products(0)",
                "Products",
                "GetSentinel",
            ))
            .with_attribute_route(AttributeRoute::new(
                Method::GET,
                "Orders({id})",
                "Orders",
                "Get",
            ))
    }

    fn select(method: Method, raw: &str) -> Option<RouteSelection> {
        let model = model();
        let convention = AttributeRoutingConvention::new(&model, &config());
        let path = DefaultPathHandler::new()
            .parse(&model, raw)
            .expect("路径应可解析");
        let catalog = ControllerCatalog::new();
        convention.select(&RoutingRequest {
            method: &method,
            path: &path,
            catalog: &catalog,
        })
    }

    #[test]
    fn placeholders_capture_keys() {
        let selection = select(Method::GET, "Products(4)/Reviews(9)").expect("应命中特性路由");
        assert_eq!(selection.action, "GetProductReview");
        assert_eq!(selection.values.get("id").map(String::as_str), Some("4"));
        assert_eq!(selection.values.get("reviewId").map(String::as_str), Some("9"));
    }

    #[test]
    fn literal_keys_and_methods_must_match() {
        assert_eq!(
            select(Method::GET, "Products(0)").map(|s| s.action),
            Some("GetSentinel".to_owned())
        );
        assert!(select(Method::GET, "Products(1)").is_none());
        assert!(select(Method::DELETE, "Products(0)").is_none());
    }

    #[test]
    #[tracing_test::traced_test]
    fn unparsable_templates_are_skipped_with_warning() {
        let convention = AttributeRoutingConvention::new(&model(), &config());
        assert_eq!(convention.len(), 2);
        assert!(logs_contain("skipping attribute route with unparsable template"));
    }
}
