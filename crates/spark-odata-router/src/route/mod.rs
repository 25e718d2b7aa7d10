//! 路由与宿主路由表。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主以名称登记两类路由：带前缀的 OData 路由，以及挂载在固定模板上的批处理路由；
//! - **逻辑（How）**：[`RouteTable`] 以 `parking_lot::RwLock` 保护按插入顺序排列的路由条目；
//!   解析请求时先取快照再释放锁，批处理模板优先于 OData 路由匹配；
//! - **契约（What）**：名称在两类路由之间共享唯一性约束，重复写入返回
//!   [`RouteTableError::DuplicateName`] 且不修改路由表。

mod constraint;

use std::{fmt, sync::Arc};

use http::{Method, Request};
use parking_lot::RwLock;

use crate::{batch::BatchHandler, error::RouteTableError};

pub use constraint::{ODataPathRouteConstraint, RouteMatch};

/// 带前缀的 OData 路由。
#[derive(Debug)]
pub struct ODataRoute {
    prefix: String,
    constraint: ODataPathRouteConstraint,
}

impl ODataRoute {
    pub fn new(prefix: impl Into<String>, constraint: ODataPathRouteConstraint) -> Self {
        Self {
            prefix: prefix.into(),
            constraint,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn constraint(&self) -> &ODataPathRouteConstraint {
        &self.constraint
    }

    pub fn route_name(&self) -> &str {
        self.constraint.route_name()
    }

    /// 匹配完整请求路径（含路由前缀）。
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let relative = self.strip_prefix(path)?;
        self.constraint.resolve(method, relative)
    }

    fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if self.prefix.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || self.prefix.ends_with('/') {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }
}

/// 批处理路由：固定模板绑定到批处理处理器。
pub struct BatchRoute {
    name: String,
    template: String,
    handler: Arc<BatchHandler>,
}

impl BatchRoute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn handler(&self) -> &Arc<BatchHandler> {
        &self.handler
    }
}

impl fmt::Debug for BatchRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRoute")
            .field("name", &self.name)
            .field("template", &self.template)
            .finish()
    }
}

/// 路由表中的条目。
#[derive(Clone, Debug)]
pub enum RouteEntry {
    OData(Arc<ODataRoute>),
    Batch(Arc<BatchRoute>),
}

/// 请求解析结果。
#[derive(Clone, Debug)]
pub enum RouteResolution {
    Batch(Arc<BatchRoute>),
    OData(RouteMatch),
}

/// 宿主路由表。
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: RwLock<Vec<(String, RouteEntry)>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记 OData 路由。
    pub fn add_route(
        &self,
        name: impl Into<String>,
        route: Arc<ODataRoute>,
    ) -> Result<(), RouteTableError> {
        self.insert(name.into(), RouteEntry::OData(route))
    }

    /// 登记批处理路由并返回其句柄。
    pub fn add_batch_route(
        &self,
        name: impl Into<String>,
        template: impl Into<String>,
        handler: Arc<BatchHandler>,
    ) -> Result<Arc<BatchRoute>, RouteTableError> {
        let name = name.into();
        let route = Arc::new(BatchRoute {
            name: name.clone(),
            template: template.into(),
            handler,
        });
        self.insert(name, RouteEntry::Batch(Arc::clone(&route)))?;
        Ok(route)
    }

    fn insert(&self, name: String, entry: RouteEntry) -> Result<(), RouteTableError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|(existing, _)| *existing == name) {
            return Err(RouteTableError::DuplicateName { name });
        }
        entries.push((name, entry));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<RouteEntry> {
        self.entries
            .read()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, entry)| entry.clone())
    }

    pub fn odata_route(&self, name: &str) -> Option<Arc<ODataRoute>> {
        match self.get(name)? {
            RouteEntry::OData(route) => Some(route),
            RouteEntry::Batch(_) => None,
        }
    }

    pub fn batch_route(&self, name: &str) -> Option<Arc<BatchRoute>> {
        match self.get(name)? {
            RouteEntry::Batch(route) => Some(route),
            RouteEntry::OData(_) => None,
        }
    }

    /// 按插入顺序返回全部路由名。
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 解析请求：先匹配批处理模板，再按插入顺序尝试 OData 路由。
    pub fn resolve<B>(&self, request: &Request<B>) -> Option<RouteResolution> {
        let snapshot: Vec<RouteEntry> = self
            .entries
            .read()
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect();
        let path = request.uri().path().trim_start_matches('/');

        let batch = snapshot.iter().find_map(|entry| match entry {
            RouteEntry::Batch(route) if route.template == path => Some(Arc::clone(route)),
            _ => None,
        });
        if let Some(route) = batch {
            return Some(RouteResolution::Batch(route));
        }

        snapshot.iter().find_map(|entry| match entry {
            RouteEntry::OData(route) => route
                .resolve(request.method(), path)
                .map(RouteResolution::OData),
            RouteEntry::Batch(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convention::{ControllerCatalog, platform_default_conventions},
        path::DefaultPathHandler,
    };
    use spark_odata_core::{EdmModel, EntityType};

    fn route(name: &str, prefix: &str) -> Arc<ODataRoute> {
        let model = Arc::new(
            EdmModel::builder("Shop")
                .entity_type(EntityType::new("Product").key("Id"))
                .entity_set("Products", "Product")
                .build(),
        );
        let catalog = ControllerCatalog::new().controller("Products", ["Get"]);
        Arc::new(ODataRoute::new(
            prefix,
            ODataPathRouteConstraint::new(
                Arc::new(DefaultPathHandler::new()),
                model,
                name,
                platform_default_conventions(),
                Arc::new(catalog),
            ),
        ))
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .body(())
            .expect("请求应可构造")
    }

    #[test]
    fn names_are_unique_across_route_kinds() {
        let table = RouteTable::new();
        table
            .add_batch_route("odata", "$batch", Arc::new(BatchHandler::new()))
            .expect("首次登记");
        let err = table
            .add_route("odata", route("odata", ""))
            .expect_err("同名应冲突");
        assert_eq!(
            err,
            RouteTableError::DuplicateName {
                name: "odata".to_owned()
            }
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn resolves_prefixed_paths_and_batch_first() {
        let table = RouteTable::new();
        table.add_route("odata", route("odata", "odata")).expect("登记");
        table
            .add_batch_route("odataBatch", "odata/$batch", Arc::new(BatchHandler::new()))
            .expect("登记");

        match table.resolve(&get("/odata/Products(2)")) {
            Some(RouteResolution::OData(matched)) => {
                assert_eq!(matched.route_name, "odata");
                assert_eq!(matched.selection.action, "Get");
            }
            other => panic!("应命中 OData 路由: {other:?}"),
        }
        assert!(matches!(
            table.resolve(&get("/odata/$batch")),
            Some(RouteResolution::Batch(_))
        ));
        assert!(table.resolve(&get("/other/Products")).is_none());
        assert!(table.resolve(&get("/odataProducts")).is_none());
        assert_eq!(table.names(), vec!["odata".to_owned(), "odataBatch".to_owned()]);
    }

    #[test]
    fn prefix_with_trailing_slash_keeps_its_boundary() {
        let route = route("api", "api/");
        assert!(route.resolve(&Method::GET, "api//Products").is_some());
        assert!(route.resolve(&Method::GET, "/api/Products").is_some());
        assert!(route.resolve(&Method::GET, "apiProducts").is_none());
    }
}
