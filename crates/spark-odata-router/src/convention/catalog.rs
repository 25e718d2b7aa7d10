use std::collections::{BTreeMap, BTreeSet};

/// 控制器目录：控制器名称到其声明的动作名称集合。
///
/// 路由约定据此判断候选动作是否存在；目录在注册前构建完成，之后只读。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerCatalog {
    controllers: BTreeMap<String, BTreeSet<String>>,
}

impl ControllerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明控制器及其动作；重复声明时合并动作集合。
    pub fn controller<I, S>(mut self, name: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.controllers
            .entry(name.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, controller: &str) -> bool {
        self.controllers.contains_key(controller)
    }

    pub fn has_action(&self, controller: &str, action: &str) -> bool {
        self.controllers
            .get(controller)
            .is_some_and(|actions| actions.contains(action))
    }

    /// 返回候选列表中首个已声明的动作。
    pub fn first_declared<'c>(&self, controller: &str, candidates: &'c [String]) -> Option<&'c str> {
        candidates
            .iter()
            .map(String::as_str)
            .find(|action| self.has_action(controller, action))
    }
}
