use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{error::DomainError, model::EdmModel};

/// `Domain` 描述一个可异步加载实体数据模型的数据源。
///
/// # 教案式说明
/// - **意图 (Why)**：路由注册只需要 Domain 提供的模型；Domain 本身由工厂按需创建、用完即释放；
/// - **契约 (What)**：
///   - `model` 可能失败，失败原样向注册器传播；
///   - 释放语义即 `Drop`：注册器在模型加载结束后立即丢弃实例，不会跨调用复用或共享；
///   - 实现需满足 `Send + Sync`，以便在多线程运行时中等待模型加载。
#[async_trait]
pub trait Domain: Send + Sync {
    /// 异步获取实体数据模型。
    async fn model(&self) -> Result<Arc<EdmModel>, DomainError>;
}

/// 按需创建 [`Domain`] 实例的共享工厂。
pub type DomainFactory = Arc<dyn Fn() -> Box<dyn Domain> + Send + Sync>;

/// 将闭包包装为 [`DomainFactory`]。
pub fn domain_factory<F>(factory: F) -> DomainFactory
where
    F: Fn() -> Box<dyn Domain> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// 以 Domain 为后端的控制器类型。
///
/// # 教案式说明
/// - **意图 (Why)**：第二个路由注册入口以控制器类型代替显式工厂：每次需要 Domain 时构造一个默认控制器，
///   取其 Domain；控制器名称同时绑定到兜底路由约定；
/// - **契约 (What)**：`NAME` 需与宿主控制器目录中的名称一致。
pub trait DomainController: Default + Send + Sync + 'static {
    /// 控制器类型名。
    const NAME: &'static str;

    /// 返回该控制器使用的 Domain。
    fn domain(&self) -> Box<dyn Domain>;

    /// 以“构造默认控制器并取其 Domain”的方式生成工厂。
    fn domain_factory() -> DomainFactory
    where
        Self: Sized,
    {
        domain_factory(|| Self::default().domain())
    }
}

/// 返回固定模型的 Domain，适合模型在进程启动前已构建完成的宿主。
#[derive(Clone)]
pub struct StaticDomain {
    model: Arc<EdmModel>,
}

impl StaticDomain {
    pub fn new(model: Arc<EdmModel>) -> Self {
        Self { model }
    }
}

impl fmt::Debug for StaticDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticDomain")
            .field("namespace", &self.model.namespace())
            .finish()
    }
}

#[async_trait]
impl Domain for StaticDomain {
    async fn model(&self) -> Result<Arc<EdmModel>, DomainError> {
        Ok(Arc::clone(&self.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CatalogController;

    impl DomainController for CatalogController {
        const NAME: &'static str = "Catalog";

        fn domain(&self) -> Box<dyn Domain> {
            Box::new(StaticDomain::new(Arc::new(EdmModel::builder("Catalog").build())))
        }
    }

    #[tokio::test]
    async fn controller_factory_yields_controller_domain() {
        let factory = CatalogController::domain_factory();
        let domain = factory();
        let model = domain.model().await.expect("静态模型应直接返回");
        assert_eq!(model.namespace(), "Catalog");
    }
}
