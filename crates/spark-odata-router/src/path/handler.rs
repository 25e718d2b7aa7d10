use std::fmt;

use parking_lot::RwLock;
use spark_odata_core::{EdmModel, ResolverSettings};

use super::{ODataPath, PathSegment};
use crate::error::PathError;

/// 把请求路径解析为 [`ODataPath`] 的协作者。
///
/// # 教案式说明
/// - **意图 (Why)**：不同版本的解析器把解析选项放在不同名称的槽位中。注册器需要在不了解具体实现的前提下
///   写入当前配置，因此槽位以“能力”形式暴露：实现方按自身版本覆盖对应的访问器；
/// - **契约 (What)**：
///   - `parse` 接收去除路由前缀后的相对路径，返回的段名称均为模型中的规范名称；
///   - `as_legacy_resolver` / `as_current_resolver` 默认返回 `None`，表示该版本不提供对应槽位；
///   - 实现需满足 `Send + Sync`，同一实例会被路由约束跨请求共享。
pub trait PathHandler: Send + Sync + fmt::Debug {
    /// 解析相对路径。
    fn parse(&self, model: &EdmModel, path: &str) -> Result<ODataPath, PathError>;

    /// 旧版本解析器的配置槽位。
    fn as_legacy_resolver(&self) -> Option<&dyn HasLegacyResolverSlot> {
        None
    }

    /// 当前版本解析器的配置槽位。
    fn as_current_resolver(&self) -> Option<&dyn HasCurrentResolverSlot> {
        None
    }
}

/// 可写的解析选项槽位。
#[derive(Debug, Default)]
pub struct ResolverSettingsSlot {
    inner: RwLock<ResolverSettings>,
}

impl ResolverSettingsSlot {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> ResolverSettings {
        self.inner.read().clone()
    }

    pub fn set(&self, settings: ResolverSettings) {
        *self.inner.write() = settings;
    }
}

/// 以旧名称暴露解析选项槽位的能力。
pub trait HasLegacyResolverSlot {
    fn legacy_resolver_slot(&self) -> &ResolverSettingsSlot;
}

/// 以当前名称暴露解析选项槽位的能力。
pub trait HasCurrentResolverSlot {
    fn current_resolver_slot(&self) -> &ResolverSettingsSlot;
}

/// 兼容补丁的执行结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverPatchOutcome {
    /// 宿主没有可传播的解析选项。
    NoSettings,
    /// 解析器不提供任何已知槽位。
    NoSlot,
    /// 已写入的槽位。
    Applied { legacy: bool, current: bool },
}

/// 把宿主的解析选项写入解析器暴露的全部已知槽位。
///
/// # 教案式说明
/// - **意图 (Why)**：同一依赖的不同版本以两个名称暴露同一配置，注册器无法预知实际版本；
/// - **逻辑 (How)**：宿主无配置时直接返回；否则依次检查旧槽位与新槽位，存在即写入，两者都存在时都写；
/// - **契约 (What)**：永不失败，槽位缺失是可预期的结果而非错误。
pub fn apply_resolver_patch(
    handler: &dyn PathHandler,
    settings: Option<&ResolverSettings>,
) -> ResolverPatchOutcome {
    let Some(settings) = settings else {
        return ResolverPatchOutcome::NoSettings;
    };

    let legacy = handler
        .as_legacy_resolver()
        .map(|slot| slot.legacy_resolver_slot().set(settings.clone()))
        .is_some();
    let current = handler
        .as_current_resolver()
        .map(|slot| slot.current_resolver_slot().set(settings.clone()))
        .is_some();

    if legacy || current {
        ResolverPatchOutcome::Applied { legacy, current }
    } else {
        ResolverPatchOutcome::NoSlot
    }
}

/// 默认路径解析器。
///
/// 以当前名称暴露解析选项槽位；`case_insensitive` 与 `unqualified_name_call` 影响名称匹配。
#[derive(Debug, Default)]
pub struct DefaultPathHandler {
    resolver: ResolverSettingsSlot,
}

impl DefaultPathHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ResolverSettings) -> Self {
        Self {
            resolver: ResolverSettingsSlot::new(settings),
        }
    }

    /// 当前生效的解析选项。
    pub fn settings(&self) -> ResolverSettings {
        self.resolver.get()
    }
}

impl HasCurrentResolverSlot for DefaultPathHandler {
    fn current_resolver_slot(&self) -> &ResolverSettingsSlot {
        &self.resolver
    }
}

impl PathHandler for DefaultPathHandler {
    fn parse(&self, model: &EdmModel, path: &str) -> Result<ODataPath, PathError> {
        let settings = self.resolver.get();
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_matches('/');
        if path.is_empty() {
            return Ok(ODataPath::default());
        }

        let mut parser = Parser {
            model,
            settings: &settings,
            segments: Vec::new(),
            cursor: Cursor::Root,
        };
        let mut previous = "~";
        for raw in path.split('/') {
            if raw.is_empty() {
                return Err(PathError::EmptySegment {
                    path: path.to_owned(),
                });
            }
            parser.step(raw, previous)?;
            previous = raw;
        }
        Ok(ODataPath::new(parser.segments))
    }

    fn as_current_resolver(&self) -> Option<&dyn HasCurrentResolverSlot> {
        Some(self)
    }
}

/// 解析游标：记录上一段之后允许出现什么。
enum Cursor {
    Root,
    Collection { entity_type: String },
    Entity { entity_type: String },
    Property,
    Terminal,
}

struct Parser<'a> {
    model: &'a EdmModel,
    settings: &'a ResolverSettings,
    segments: Vec<PathSegment>,
    cursor: Cursor,
}

impl Parser<'_> {
    fn step(&mut self, raw: &str, previous: &str) -> Result<(), PathError> {
        let unexpected = || PathError::UnexpectedSegment {
            segment: raw.to_owned(),
            after: previous.to_owned(),
        };

        let next = match std::mem::replace(&mut self.cursor, Cursor::Terminal) {
            Cursor::Root => self.root(raw)?,
            Cursor::Collection { entity_type } => match raw {
                "$count" => self.push(PathSegment::Count, Cursor::Terminal),
                "$ref" => self.push(PathSegment::Ref, Cursor::Terminal),
                _ => self.after_source(raw, &entity_type, false)?,
            },
            Cursor::Entity { entity_type } => match raw {
                "$value" => self.push(PathSegment::Value, Cursor::Terminal),
                "$ref" => self.push(PathSegment::Ref, Cursor::Terminal),
                "$count" => return Err(unexpected()),
                _ => self.after_source(raw, &entity_type, true)?,
            },
            Cursor::Property if raw == "$value" => self.push(PathSegment::Value, Cursor::Terminal),
            Cursor::Property | Cursor::Terminal => return Err(unexpected()),
        };
        self.cursor = next;
        Ok(())
    }

    fn push(&mut self, segment: PathSegment, next: Cursor) -> Cursor {
        self.segments.push(segment);
        next
    }

    fn root(&mut self, raw: &str) -> Result<Cursor, PathError> {
        match raw {
            "$metadata" => return Ok(self.push(PathSegment::Metadata, Cursor::Terminal)),
            "$batch" => return Ok(self.push(PathSegment::Batch, Cursor::Terminal)),
            _ => {}
        }

        let model = self.model;
        let ci = self.settings.case_insensitive;
        let (name, key) = split_key(raw)?;
        if let Some(set) = model.find_entity_set(name, ci) {
            let entity_type = set.entity_type.clone();
            self.segments.push(PathSegment::EntitySet {
                name: set.name.clone(),
                entity_type: entity_type.clone(),
            });
            return Ok(match key {
                Some(value) => {
                    self.push_key(raw, value)?;
                    Cursor::Entity { entity_type }
                }
                None => Cursor::Collection { entity_type },
            });
        }

        if let Some(singleton) = model.find_singleton(name, ci) {
            if key.is_some() {
                return Err(malformed(raw));
            }
            let entity_type = singleton.entity_type.clone();
            let segment = PathSegment::Singleton {
                name: singleton.name.clone(),
                entity_type: entity_type.clone(),
            };
            return Ok(self.push(segment, Cursor::Entity { entity_type }));
        }

        if let Some(operation) = model.find_operation_import(name, ci) {
            let segment = PathSegment::OperationImport {
                name: operation.name.clone(),
                kind: operation.kind,
            };
            return Ok(self.push(segment, Cursor::Terminal));
        }

        Err(unknown(name))
    }

    fn after_source(
        &mut self,
        raw: &str,
        entity_type: &str,
        single: bool,
    ) -> Result<Cursor, PathError> {
        let (model, settings) = (self.model, self.settings);
        let ci = settings.case_insensitive;
        let (name, key) = split_key(raw)?;

        if let Some(operation) = model.find_bound_operation(name, entity_type, settings) {
            let segment = PathSegment::Operation {
                name: operation.name.clone(),
                kind: operation.kind,
            };
            return Ok(self.push(segment, Cursor::Terminal));
        }

        let definition = model
            .entity_type(entity_type)
            .ok_or_else(|| unknown(entity_type))?;

        if let Some(navigation) = definition.find_navigation(name, ci) {
            if !single {
                return Err(PathError::UnexpectedSegment {
                    segment: raw.to_owned(),
                    after: entity_type.to_owned(),
                });
            }
            let target = model
                .find_entity_set(&navigation.target_set, false)
                .ok_or_else(|| unknown(&navigation.target_set))?;
            let target_type = target.entity_type.clone();
            let collection = navigation.collection;
            self.segments.push(PathSegment::Navigation {
                name: navigation.name.clone(),
                target_set: navigation.target_set.clone(),
                collection,
            });
            return Ok(match key {
                Some(value) if collection => {
                    self.push_key(raw, value)?;
                    Cursor::Entity {
                        entity_type: target_type,
                    }
                }
                Some(_) => return Err(malformed(raw)),
                None if collection => Cursor::Collection {
                    entity_type: target_type,
                },
                None => Cursor::Entity {
                    entity_type: target_type,
                },
            });
        }

        if let Some(property) = definition.find_property(name, ci) {
            if !single {
                return Err(PathError::UnexpectedSegment {
                    segment: raw.to_owned(),
                    after: entity_type.to_owned(),
                });
            }
            if key.is_some() {
                return Err(malformed(raw));
            }
            let segment = PathSegment::Property {
                name: property.to_owned(),
            };
            return Ok(self.push(segment, Cursor::Property));
        }

        Err(unknown(name))
    }

    fn push_key(&mut self, raw: &str, value: &str) -> Result<(), PathError> {
        if value.trim().is_empty() {
            return Err(malformed(raw));
        }
        self.segments.push(PathSegment::Key {
            value: value.to_owned(),
        });
        Ok(())
    }
}

/// 拆分 `Name(key)` 形式的段；无括号时主键为 `None`。
fn split_key(raw: &str) -> Result<(&str, Option<&str>), PathError> {
    match raw.find('(') {
        Some(open) if raw.ends_with(')') && open > 0 => {
            Ok((&raw[..open], Some(&raw[open + 1..raw.len() - 1])))
        }
        Some(_) => Err(malformed(raw)),
        None if raw.contains(')') => Err(malformed(raw)),
        None => Ok((raw, None)),
    }
}

fn malformed(segment: &str) -> PathError {
    PathError::MalformedKey {
        segment: segment.to_owned(),
    }
}

fn unknown(segment: &str) -> PathError {
    PathError::UnknownSegment {
        segment: segment.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_odata_core::EntityType;

    fn model() -> EdmModel {
        EdmModel::builder("Shop")
            .entity_type(
                EntityType::new("Product")
                    .key("Id")
                    .property("Name")
                    .navigation("Category", "Categories", false)
                    .navigation("Reviews", "Reviews", true),
            )
            .entity_type(EntityType::new("Category").key("Id"))
            .entity_type(EntityType::new("Review").key("Id").property("Text"))
            .entity_set("Products", "Product")
            .entity_set("Categories", "Category")
            .entity_set("Reviews", "Review")
            .singleton("Featured", "Product")
            .function("TopSelling", None)
            .action("Discount", Some("Product"))
            .build()
    }

    fn parse(handler: &DefaultPathHandler, path: &str) -> Result<ODataPath, PathError> {
        handler.parse(&model(), path)
    }

    #[test]
    fn parses_entity_navigation_and_key() {
        let handler = DefaultPathHandler::new();
        let path = parse(&handler, "Products(1)/Reviews(5)").expect("路径应可解析");
        assert_eq!(path.template(), "~/entityset/key/navigation/key");
        assert_eq!(path.keys().collect::<Vec<_>>(), vec!["1", "5"]);
    }

    #[test]
    fn parses_system_segments_and_imports() {
        let handler = DefaultPathHandler::new();
        assert_eq!(
            parse(&handler, "$metadata").expect("元数据").template(),
            "~/$metadata"
        );
        assert_eq!(
            parse(&handler, "Products/$count").expect("计数").template(),
            "~/entityset/$count"
        );
        assert_eq!(
            parse(&handler, "Products(1)/Name/$value").expect("属性原值").template(),
            "~/entityset/key/property/$value"
        );
        assert_eq!(
            parse(&handler, "TopSelling()").expect("函数导入").template(),
            "~/unboundfunction"
        );
        assert_eq!(parse(&handler, "/").expect("服务根").template(), "~");
    }

    #[test]
    fn bound_operation_requires_qualification_unless_configured() {
        let strict = DefaultPathHandler::new();
        assert!(parse(&strict, "Products(1)/Shop.Discount").is_ok());
        assert!(matches!(
            parse(&strict, "Products(1)/Discount"),
            Err(PathError::UnknownSegment { .. })
        ));

        let relaxed = DefaultPathHandler::with_settings(ResolverSettings {
            unqualified_name_call: true,
            ..ResolverSettings::default()
        });
        let path = parse(&relaxed, "Products(1)/Discount").expect("应接受非限定名称");
        assert_eq!(path.template(), "~/entityset/key/action");
    }

    #[test]
    fn case_insensitive_setting_returns_canonical_names() {
        let handler = DefaultPathHandler::new();
        assert!(parse(&handler, "products(1)").is_err());

        handler.current_resolver_slot().set(ResolverSettings {
            case_insensitive: true,
            ..ResolverSettings::default()
        });
        let path = parse(&handler, "products(1)/category").expect("大小写不敏感");
        assert_eq!(path.to_string(), "Products(1)/Category");
    }

    #[test]
    fn rejects_malformed_paths() {
        let handler = DefaultPathHandler::new();
        assert!(matches!(
            parse(&handler, "Products(1"),
            Err(PathError::MalformedKey { .. })
        ));
        assert!(matches!(
            parse(&handler, "Products()"),
            Err(PathError::MalformedKey { .. })
        ));
        assert!(matches!(
            parse(&handler, "Products//Name"),
            Err(PathError::EmptySegment { .. })
        ));
        assert!(matches!(
            parse(&handler, "$metadata/Products"),
            Err(PathError::UnexpectedSegment { .. })
        ));
        assert!(matches!(
            parse(&handler, "Products/Name"),
            Err(PathError::UnexpectedSegment { .. })
        ));
        assert!(matches!(
            parse(&handler, "Orders"),
            Err(PathError::UnknownSegment { .. })
        ));
    }

    #[derive(Debug, Default)]
    struct LegacyOnly {
        slot: ResolverSettingsSlot,
    }

    impl HasLegacyResolverSlot for LegacyOnly {
        fn legacy_resolver_slot(&self) -> &ResolverSettingsSlot {
            &self.slot
        }
    }

    impl PathHandler for LegacyOnly {
        fn parse(&self, _model: &EdmModel, _path: &str) -> Result<ODataPath, PathError> {
            Ok(ODataPath::default())
        }

        fn as_legacy_resolver(&self) -> Option<&dyn HasLegacyResolverSlot> {
            Some(self)
        }
    }

    #[derive(Debug)]
    struct NoSlots;

    impl PathHandler for NoSlots {
        fn parse(&self, _model: &EdmModel, _path: &str) -> Result<ODataPath, PathError> {
            Ok(ODataPath::default())
        }
    }

    #[test]
    fn patch_writes_whichever_slot_exists() {
        let settings = ResolverSettings {
            case_insensitive: true,
            ..ResolverSettings::default()
        };

        let current = DefaultPathHandler::new();
        assert_eq!(
            apply_resolver_patch(&current, Some(&settings)),
            ResolverPatchOutcome::Applied {
                legacy: false,
                current: true
            }
        );
        assert_eq!(current.settings(), settings);

        let legacy = LegacyOnly::default();
        assert_eq!(
            apply_resolver_patch(&legacy, Some(&settings)),
            ResolverPatchOutcome::Applied {
                legacy: true,
                current: false
            }
        );
        assert_eq!(legacy.slot.get(), settings);

        assert_eq!(
            apply_resolver_patch(&NoSlots, Some(&settings)),
            ResolverPatchOutcome::NoSlot
        );
        assert_eq!(
            apply_resolver_patch(&current, None),
            ResolverPatchOutcome::NoSettings
        );
    }

    /// 同时以新旧两个名称暴露槽位的过渡版本解析器。
    #[derive(Debug, Default)]
    struct Transitional {
        legacy: ResolverSettingsSlot,
        current: ResolverSettingsSlot,
    }

    impl HasLegacyResolverSlot for Transitional {
        fn legacy_resolver_slot(&self) -> &ResolverSettingsSlot {
            &self.legacy
        }
    }

    impl HasCurrentResolverSlot for Transitional {
        fn current_resolver_slot(&self) -> &ResolverSettingsSlot {
            &self.current
        }
    }

    impl PathHandler for Transitional {
        fn parse(&self, _model: &EdmModel, _path: &str) -> Result<ODataPath, PathError> {
            Ok(ODataPath::default())
        }

        fn as_legacy_resolver(&self) -> Option<&dyn HasLegacyResolverSlot> {
            Some(self)
        }

        fn as_current_resolver(&self) -> Option<&dyn HasCurrentResolverSlot> {
            Some(self)
        }
    }

    #[test]
    fn patch_writes_both_slots_when_both_exist() {
        let settings = ResolverSettings {
            case_insensitive: true,
            unqualified_name_call: true,
            enum_prefix_free: true,
        };

        let handler = Transitional::default();
        assert_eq!(
            apply_resolver_patch(&handler, Some(&settings)),
            ResolverPatchOutcome::Applied {
                legacy: true,
                current: true
            }
        );
        assert_eq!(handler.legacy.get(), settings);
        assert_eq!(handler.current.get(), settings);
    }

    #[test]
    fn enum_prefix_free_is_carried_without_affecting_paths() {
        let handler = DefaultPathHandler::new();
        let before = parse(&handler, "Products(1)/Name").expect("路径应可解析");

        let settings = ResolverSettings {
            enum_prefix_free: true,
            ..ResolverSettings::default()
        };
        apply_resolver_patch(&handler, Some(&settings));
        assert!(handler.settings().enum_prefix_free);
        assert_eq!(parse(&handler, "Products(1)/Name").expect("路径应可解析"), before);
    }
}
