//! 平台默认路由约定。
//!
//! 每个约定只认领一类路径模板，动作名按“具体名称优先、通用名称兜底”的候选顺序在控制器目录中查找，
//! 目录中不存在的动作不会被选中。

use std::sync::Arc;

use http::Method;

use super::{ConventionKind, ConventionList, RouteSelection, RoutingConvention, RoutingRequest};
use crate::path::PathSegment;

/// 按固定顺序返回平台默认约定列表，未映射约定位于末尾。
pub fn platform_default_conventions() -> ConventionList {
    let mut conventions: ConventionList = [
        ConventionKind::Metadata,
        ConventionKind::EntitySet,
        ConventionKind::Singleton,
        ConventionKind::Entity,
        ConventionKind::Navigation,
        ConventionKind::Property,
        ConventionKind::Function,
        ConventionKind::Action,
    ]
    .into_iter()
    .map(|kind| Arc::new(PlatformConvention::new(kind)) as Arc<dyn RoutingConvention>)
    .collect();
    conventions.push(Arc::new(UnmappedRequestRoutingConvention));
    conventions
}

/// 以 [`ConventionKind`] 区分的平台标准约定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformConvention {
    kind: ConventionKind,
}

impl PlatformConvention {
    pub fn new(kind: ConventionKind) -> Self {
        Self { kind }
    }

    fn candidates(&self, request: &RoutingRequest<'_>) -> Option<Vec<String>> {
        let path = request.path;
        let method = request.method;
        let template = path.template();
        let source_type = match path.first()? {
            PathSegment::EntitySet { entity_type, .. } | PathSegment::Singleton { entity_type, .. } => {
                entity_type.as_str()
            }
            _ => return None,
        };
        let source = path.navigation_source()?;

        let names = match (self.kind, template.as_str()) {
            (ConventionKind::EntitySet, "~/entityset") => match *method {
                Method::GET => vec![format!("Get{source}"), "Get".to_owned()],
                Method::POST => vec![format!("Post{source_type}"), "Post".to_owned()],
                _ => return None,
            },
            (ConventionKind::EntitySet, "~/entityset/$count") if method == Method::GET => {
                vec![format!("Get{source}"), "Get".to_owned()]
            }
            (ConventionKind::Singleton, "~/singleton") => {
                let verb = update_verb(method)?;
                vec![format!("{verb}{source}"), verb.to_owned()]
            }
            (ConventionKind::Entity, "~/entityset/key") => {
                let verb = update_verb(method).or((method == Method::DELETE).then_some("Delete"))?;
                vec![format!("{verb}{source_type}"), verb.to_owned()]
            }
            (ConventionKind::Navigation, _) => {
                let navigation = match path.last()? {
                    PathSegment::Navigation {
                        name, collection, ..
                    } => (name, *collection),
                    _ => return None,
                };
                let verb = match *method {
                    Method::GET => "Get",
                    Method::POST if navigation.1 => "PostTo",
                    Method::PUT => "PutTo",
                    _ => return None,
                };
                vec![format!("{verb}{}", navigation.0)]
            }
            (ConventionKind::Property, _) => {
                let property = path.segments().iter().rev().find_map(|segment| match segment {
                    PathSegment::Property { name } => Some(name),
                    _ => None,
                })?;
                if !matches!(
                    path.last(),
                    Some(PathSegment::Property { .. } | PathSegment::Value)
                ) {
                    return None;
                }
                let verb = match *method {
                    Method::GET => "Get",
                    Method::PUT => "PutTo",
                    Method::PATCH => "PatchTo",
                    Method::DELETE => "DeleteTo",
                    _ => return None,
                };
                vec![format!("{verb}{property}")]
            }
            (ConventionKind::Function, _) => match path.last()? {
                PathSegment::Operation {
                    name,
                    kind: spark_odata_core::OperationKind::Function,
                } if method == Method::GET => vec![format!("{name}On{source_type}"), name.clone()],
                _ => return None,
            },
            (ConventionKind::Action, _) => match path.last()? {
                PathSegment::Operation {
                    name,
                    kind: spark_odata_core::OperationKind::Action,
                } if method == Method::POST => vec![format!("{name}On{source_type}"), name.clone()],
                _ => return None,
            },
            _ => return None,
        };
        Some(names)
    }
}

impl RoutingConvention for PlatformConvention {
    fn kind(&self) -> ConventionKind {
        self.kind
    }

    fn select(&self, request: &RoutingRequest<'_>) -> Option<RouteSelection> {
        if self.kind == ConventionKind::Metadata {
            let action = match request.path.template().as_str() {
                "~" => "GetServiceDocument",
                "~/$metadata" => "GetMetadata",
                _ => return None,
            };
            return (request.method == Method::GET)
                .then(|| RouteSelection::new(self.kind, "Metadata", action));
        }

        let candidates = self.candidates(request)?;
        let controller = request.path.navigation_source()?;
        let action = request.catalog.first_declared(controller, &candidates)?;
        Some(RouteSelection::new(self.kind, controller, action).with_path_keys(request.path))
    }
}

/// `PUT`/`PATCH`/`MERGE`/`GET` 对应的动作动词。
fn update_verb(method: &Method) -> Option<&'static str> {
    match *method {
        Method::GET => Some("Get"),
        Method::PUT => Some("Put"),
        Method::PATCH => Some("Patch"),
        _ if method.as_str() == "MERGE" => Some("Patch"),
        _ => None,
    }
}

/// 终止约定：仅当控制器声明了 `HandleUnmappedRequest` 时选中它，否则表示“无匹配”。
#[derive(Clone, Copy, Debug, Default)]
pub struct UnmappedRequestRoutingConvention;

impl UnmappedRequestRoutingConvention {
    pub const ACTION: &'static str = "HandleUnmappedRequest";
}

impl RoutingConvention for UnmappedRequestRoutingConvention {
    fn kind(&self) -> ConventionKind {
        ConventionKind::Unmapped
    }

    fn select(&self, request: &RoutingRequest<'_>) -> Option<RouteSelection> {
        let controller = request.path.navigation_source()?;
        request
            .catalog
            .has_action(controller, Self::ACTION)
            .then(|| {
                RouteSelection::new(ConventionKind::Unmapped, controller, Self::ACTION)
                    .with_value("odataPath", request.path.to_string())
            })
    }
}
