use std::{fmt, sync::Arc};

use http::Method;
use spark_odata_core::EdmModel;

use crate::{
    convention::{ControllerCatalog, ConventionList, RouteSelection, RoutingRequest},
    path::{ODataPath, PathHandler},
};

/// 一次成功匹配：路由名、已解析路径与约定选出的动作。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub route_name: String,
    pub path: ODataPath,
    pub selection: RouteSelection,
}

/// OData 路由的匹配约束。
///
/// # 教案式说明
/// - **意图 (Why)**：把“解析路径”与“按约定选择动作”两步绑定到一条路由上，路由表只需要询问约束是否命中；
/// - **逻辑 (How)**：用路径解析器把相对路径解析为 [`ODataPath`]，再按列表顺序询问约定，首个 `Some` 胜出；
/// - **契约 (What)**：解析失败或无约定命中都表示“本路由不匹配”，记录 `debug` 事件后返回 `None`。
pub struct ODataPathRouteConstraint {
    path_handler: Arc<dyn PathHandler>,
    model: Arc<EdmModel>,
    route_name: String,
    conventions: ConventionList,
    catalog: Arc<ControllerCatalog>,
}

impl ODataPathRouteConstraint {
    pub fn new(
        path_handler: Arc<dyn PathHandler>,
        model: Arc<EdmModel>,
        route_name: impl Into<String>,
        conventions: ConventionList,
        catalog: Arc<ControllerCatalog>,
    ) -> Self {
        Self {
            path_handler,
            model,
            route_name: route_name.into(),
            conventions,
            catalog,
        }
    }

    pub fn path_handler(&self) -> &Arc<dyn PathHandler> {
        &self.path_handler
    }

    pub fn model(&self) -> &Arc<EdmModel> {
        &self.model
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn conventions(&self) -> &ConventionList {
        &self.conventions
    }

    /// 匹配去除路由前缀后的相对路径。
    pub fn resolve(&self, method: &Method, relative_path: &str) -> Option<RouteMatch> {
        let path = match self.path_handler.parse(&self.model, relative_path) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(
                    route = %self.route_name,
                    path = relative_path,
                    code = err.code(),
                    "request path is not an OData path of this route"
                );
                return None;
            }
        };

        let request = RoutingRequest {
            method,
            path: &path,
            catalog: &self.catalog,
        };
        let Some(selection) = self
            .conventions
            .iter()
            .find_map(|convention| convention.select(&request))
        else {
            tracing::debug!(
                route = %self.route_name,
                %method,
                template = %path.template(),
                "no routing convention selected an action"
            );
            return None;
        };

        Some(RouteMatch {
            route_name: self.route_name.clone(),
            path,
            selection,
        })
    }
}

impl fmt::Debug for ODataPathRouteConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ODataPathRouteConstraint")
            .field("route_name", &self.route_name)
            .field("path_handler", &self.path_handler)
            .field("conventions", &self.conventions.len())
            .finish()
    }
}
