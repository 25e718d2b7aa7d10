//! 实体数据模型（EDM）的只读描述。
//!
//! # 教案式说明
//! - **意图（Why）**：路由层需要依据模型判断请求路径中的段落属于实体集、单例、导航属性还是操作，
//!   因此模型必须足够具体，但对路由核心而言始终只读；
//! - **逻辑（How）**：以 `BTreeMap` 保存实体类型、实体集与单例，保证遍历顺序稳定；操作以列表形式保存，
//!   同时支持“绑定到实体类型”的操作与“以导入形式暴露”的未绑定操作；
//! - **契约（What）**：本模块不做任何模式校验，构建器按调用顺序原样收集定义。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::settings::ResolverSettings;

/// 导航属性定义。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationProperty {
    /// 属性名称。
    pub name: String,
    /// 导航目标所在的实体集。
    pub target_set: String,
    /// 目标是否为集合。
    pub collection: bool,
}

/// 实体类型定义。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// 类型名称（不含命名空间）。
    pub name: String,
    /// 主键属性名。
    pub key: Vec<String>,
    /// 结构化属性名。
    pub properties: Vec<String>,
    /// 导航属性。
    pub navigation: Vec<NavigationProperty>,
}

impl EntityType {
    /// 以名称创建空的实体类型。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 追加主键属性；主键同时视为结构化属性。
    pub fn key(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        self.properties.push(property.clone());
        self.key.push(property);
        self
    }

    /// 追加结构化属性。
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }

    /// 追加导航属性。
    pub fn navigation(
        mut self,
        name: impl Into<String>,
        target_set: impl Into<String>,
        collection: bool,
    ) -> Self {
        self.navigation.push(NavigationProperty {
            name: name.into(),
            target_set: target_set.into(),
            collection,
        });
        self
    }

    /// 查找结构化属性，返回模型中的规范名称。
    pub fn find_property(&self, name: &str, case_insensitive: bool) -> Option<&str> {
        self.properties
            .iter()
            .find(|candidate| names_equal(candidate, name, case_insensitive))
            .map(String::as_str)
    }

    /// 查找导航属性。
    pub fn find_navigation(&self, name: &str, case_insensitive: bool) -> Option<&NavigationProperty> {
        self.navigation
            .iter()
            .find(|candidate| names_equal(&candidate.name, name, case_insensitive))
    }
}

/// 实体集定义。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: String,
}

/// 单例定义。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singleton {
    pub name: String,
    pub entity_type: String,
}

/// 操作种类：函数无副作用（GET），动作有副作用（POST）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Function,
    Action,
}

/// 函数或动作定义。
///
/// - `bound_to` 为 `Some(类型名)` 时表示绑定操作，只能出现在该类型的实体或集合之后；
/// - `bound_to` 为 `None` 时表示以导入形式暴露在服务根下。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub bound_to: Option<String>,
}

/// 实体数据模型。
///
/// # 教案式说明
/// - **意图 (Why)**：作为 Domain 异步加载的产物，在一次注册中被路由约定与路径解析器共享；
/// - **契约 (What)**：构建完成后不可变，通常以 `Arc<EdmModel>` 形式跨线程共享；
///   所有查找接口返回模型中的规范名称，即使启用了大小写不敏感匹配。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdmModel {
    namespace: String,
    entity_types: BTreeMap<String, EntityType>,
    entity_sets: BTreeMap<String, EntitySet>,
    singletons: BTreeMap<String, Singleton>,
    operations: Vec<Operation>,
}

impl EdmModel {
    /// 创建构建器。
    pub fn builder(namespace: impl Into<String>) -> EdmModelBuilder {
        EdmModelBuilder::new(namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.get(name)
    }

    pub fn entity_sets(&self) -> impl Iterator<Item = &EntitySet> {
        self.entity_sets.values()
    }

    pub fn singletons(&self) -> impl Iterator<Item = &Singleton> {
        self.singletons.values()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// 按名称查找实体集。
    pub fn find_entity_set(&self, name: &str, case_insensitive: bool) -> Option<&EntitySet> {
        find_by_name(&self.entity_sets, name, case_insensitive)
    }

    /// 按名称查找单例。
    pub fn find_singleton(&self, name: &str, case_insensitive: bool) -> Option<&Singleton> {
        find_by_name(&self.singletons, name, case_insensitive)
    }

    /// 查找以导入形式暴露的未绑定操作。
    pub fn find_operation_import(&self, name: &str, case_insensitive: bool) -> Option<&Operation> {
        self.operations.iter().find(|operation| {
            operation.bound_to.is_none() && names_equal(&operation.name, name, case_insensitive)
        })
    }

    /// 查找绑定到 `binding_type` 的操作。
    ///
    /// # 契约（What）
    /// - 默认要求名称带命名空间限定（`Namespace.Name`）；
    /// - 当 `settings.unqualified_name_call` 为 `true` 时，也接受不带限定的名称；
    /// - 大小写敏感性由 `settings.case_insensitive` 决定。
    pub fn find_bound_operation(
        &self,
        segment: &str,
        binding_type: &str,
        settings: &ResolverSettings,
    ) -> Option<&Operation> {
        let case_insensitive = settings.case_insensitive;
        let unqualified = match segment.rsplit_once('.') {
            Some((namespace, name)) => {
                if !names_equal(namespace, &self.namespace, case_insensitive) {
                    return None;
                }
                name
            }
            None if settings.unqualified_name_call => segment,
            None => return None,
        };

        self.operations.iter().find(|operation| {
            operation
                .bound_to
                .as_deref()
                .is_some_and(|bound| names_equal(bound, binding_type, case_insensitive))
                && names_equal(&operation.name, unqualified, case_insensitive)
        })
    }
}

/// [`EdmModel`] 构建器。
#[derive(Debug, Default)]
pub struct EdmModelBuilder {
    model: EdmModel,
}

impl EdmModelBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            model: EdmModel {
                namespace: namespace.into(),
                ..EdmModel::default()
            },
        }
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.model
            .entity_types
            .insert(entity_type.name.clone(), entity_type);
        self
    }

    pub fn entity_set(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let name = name.into();
        self.model.entity_sets.insert(
            name.clone(),
            EntitySet {
                name,
                entity_type: entity_type.into(),
            },
        );
        self
    }

    pub fn singleton(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let name = name.into();
        self.model.singletons.insert(
            name.clone(),
            Singleton {
                name,
                entity_type: entity_type.into(),
            },
        );
        self
    }

    /// 声明函数；`bound_to` 为 `None` 时作为函数导入暴露。
    pub fn function(mut self, name: impl Into<String>, bound_to: Option<&str>) -> Self {
        self.model.operations.push(Operation {
            name: name.into(),
            kind: OperationKind::Function,
            bound_to: bound_to.map(str::to_owned),
        });
        self
    }

    /// 声明动作；`bound_to` 为 `None` 时作为动作导入暴露。
    pub fn action(mut self, name: impl Into<String>, bound_to: Option<&str>) -> Self {
        self.model.operations.push(Operation {
            name: name.into(),
            kind: OperationKind::Action,
            bound_to: bound_to.map(str::to_owned),
        });
        self
    }

    pub fn build(self) -> EdmModel {
        self.model
    }
}

fn names_equal(left: &str, right: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        left.eq_ignore_ascii_case(right)
    } else {
        left == right
    }
}

fn find_by_name<'a, V>(
    map: &'a BTreeMap<String, V>,
    name: &str,
    case_insensitive: bool,
) -> Option<&'a V> {
    if let Some(found) = map.get(name) {
        return Some(found);
    }
    if !case_insensitive {
        return None;
    }
    map.iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}
