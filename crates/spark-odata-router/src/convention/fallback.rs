use std::sync::Arc;

use http::Method;
use spark_odata_core::{EdmModel, OperationKind};

use super::{ConventionKind, RouteSelection, RoutingConvention, RoutingRequest};
use crate::path::PathSegment;

/// Domain 兜底约定：把平台默认约定未认领的请求交给单一 Domain 控制器。
///
/// # 教案式说明
/// - **意图 (Why)**：Domain 控制器以一组通用动作处理模型中的全部实体集，因此无需为每个实体集声明控制器；
/// - **逻辑 (How)**：按 HTTP 方法映射动作：`GET → Get`，对动作路径的 `POST → PostAction`，其余
///   `POST → Post`，`PUT → Put`，`PATCH`/`MERGE → Patch`，`DELETE → Delete`；
/// - **契约 (What)**：不认领服务根、`$metadata` 与 `$batch`，这些路径留给元数据约定或批处理路由。
#[derive(Clone, Debug)]
pub struct DefaultDomainRoutingConvention {
    controller: String,
    model: Arc<EdmModel>,
}

impl DefaultDomainRoutingConvention {
    pub fn new(controller: impl Into<String>, model: Arc<EdmModel>) -> Self {
        Self {
            controller: controller.into(),
            model,
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn model(&self) -> &Arc<EdmModel> {
        &self.model
    }

    fn action(&self, request: &RoutingRequest<'_>) -> Option<&'static str> {
        let targets_action = matches!(
            request.path.last(),
            Some(
                PathSegment::Operation {
                    kind: OperationKind::Action,
                    ..
                } | PathSegment::OperationImport {
                    kind: OperationKind::Action,
                    ..
                }
            )
        );

        match *request.method {
            Method::GET => Some("Get"),
            Method::POST if targets_action => Some("PostAction"),
            Method::POST => Some("Post"),
            Method::PUT => Some("Put"),
            Method::PATCH => Some("Patch"),
            Method::DELETE => Some("Delete"),
            _ if request.method.as_str() == "MERGE" => Some("Patch"),
            _ => None,
        }
    }
}

impl RoutingConvention for DefaultDomainRoutingConvention {
    fn kind(&self) -> ConventionKind {
        ConventionKind::DomainFallback
    }

    fn select(&self, request: &RoutingRequest<'_>) -> Option<RouteSelection> {
        if matches!(
            request.path.first(),
            None | Some(PathSegment::Metadata | PathSegment::Batch)
        ) {
            return None;
        }

        let action = self.action(request)?;
        Some(
            RouteSelection::new(ConventionKind::DomainFallback, &self.controller, action)
                .with_path_keys(request.path),
        )
    }
}
