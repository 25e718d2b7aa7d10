use std::{fmt, sync::Arc};

use bytes::Bytes;
use http::{Request, header::ACCEPT};
use serde_json::Value;

use crate::{
    formatting::{FormatterCollection, MediaType, MediaTypeFormatter},
    settings::NegotiationSettings,
};

/// `NegotiationResult` 描述一次内容协商的结果。
///
/// # 契约说明（What）
/// - `formatter` 为最终选中的格式化器；
/// - `media_type` 为写入响应 `Content-Type` 的具体媒体类型，不含通配符。
#[derive(Clone, Debug)]
pub struct NegotiationResult {
    formatter: Arc<dyn MediaTypeFormatter>,
    media_type: MediaType,
}

impl NegotiationResult {
    pub fn new(formatter: Arc<dyn MediaTypeFormatter>, media_type: MediaType) -> Self {
        Self {
            formatter,
            media_type,
        }
    }

    pub fn formatter(&self) -> &Arc<dyn MediaTypeFormatter> {
        &self.formatter
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }
}

/// `ContentNegotiator` 根据请求与格式化器集合为候选响应体选择格式。
///
/// # 契约说明（What）
/// - 返回 `None` 表示不存在可接受的格式，由调用方决定失败行为（通常为 406）；
/// - 实现不得修改请求或格式化器集合。
pub trait ContentNegotiator: Send + Sync + fmt::Debug {
    fn negotiate(
        &self,
        content: &Value,
        request: &Request<Bytes>,
        formatters: &FormatterCollection,
    ) -> Option<NegotiationResult>;
}

/// 基于 `Accept` 头的默认协商器。
///
/// # 教案式说明
/// - **逻辑（How）**：
///   1. 过滤出能够写出内容的格式化器；
///   2. 解析全部 `Accept` 值，丢弃 `q=0` 的范围，按质量值降序、同质量时具体范围优先稳定排序；
///   3. 依次用每个范围匹配格式化器声明的媒体类型，首个命中即为结果；
///   4. 未携带 `Accept` 时直接选首个可写格式化器的首选媒体类型（全部范围为 `q=0` 时视为携带但无命中）；
///   5. 有 `Accept` 但无命中时，若未开启 `exclude_match_on_type_only`，回落到首个可写格式化器。
/// - **契约（What）**：仅当没有可写格式化器，或开启严格模式且无范围命中时返回 `None`。
#[derive(Clone, Debug, Default)]
pub struct DefaultContentNegotiator {
    exclude_match_on_type_only: bool,
}

impl DefaultContentNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &NegotiationSettings) -> Self {
        Self {
            exclude_match_on_type_only: settings.exclude_match_on_type_only,
        }
    }

    /// 严格模式：`Accept` 无法匹配时不回落。
    pub fn excluding_match_on_type_only(mut self) -> Self {
        self.exclude_match_on_type_only = true;
        self
    }
}

impl ContentNegotiator for DefaultContentNegotiator {
    fn negotiate(
        &self,
        content: &Value,
        request: &Request<Bytes>,
        formatters: &FormatterCollection,
    ) -> Option<NegotiationResult> {
        let candidates: Vec<&Arc<dyn MediaTypeFormatter>> = formatters
            .iter()
            .filter(|formatter| formatter.can_write(content))
            .collect();
        let fallback = candidates.iter().find_map(|formatter| {
            formatter
                .supported_media_types()
                .first()
                .map(|media_type| NegotiationResult::new(Arc::clone(formatter), media_type.clone()))
        });

        if !request.headers().contains_key(ACCEPT) {
            return fallback;
        }

        for (range, _) in &accept_ranges(request) {
            for formatter in &candidates {
                if let Some(media_type) = formatter
                    .supported_media_types()
                    .iter()
                    .find(|media_type| media_type.matches(range))
                {
                    return Some(NegotiationResult::new(
                        Arc::clone(formatter),
                        media_type.clone(),
                    ));
                }
            }
        }

        if self.exclude_match_on_type_only {
            None
        } else {
            fallback
        }
    }
}

/// 宿主级的格式化服务：协商器与格式化器集合。
#[derive(Clone, Debug)]
pub struct FormattingServices {
    pub negotiator: Arc<dyn ContentNegotiator>,
    pub formatters: FormatterCollection,
}

impl FormattingServices {
    pub fn new(negotiator: Arc<dyn ContentNegotiator>, formatters: FormatterCollection) -> Self {
        Self {
            negotiator,
            formatters,
        }
    }

    pub fn from_settings(settings: &NegotiationSettings) -> Self {
        Self::new(
            Arc::new(DefaultContentNegotiator::from_settings(settings)),
            FormatterCollection::json(),
        )
    }
}

impl Default for FormattingServices {
    fn default() -> Self {
        Self::from_settings(&NegotiationSettings::default())
    }
}

/// 解析请求的全部 `Accept` 范围，返回按质量值降序排列的 `(范围, 质量)`。
fn accept_ranges(request: &Request<Bytes>) -> Vec<(MediaType, f32)> {
    let mut ranges: Vec<(MediaType, f32)> = request
        .headers()
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(MediaType::parse)
        .map(|range| {
            let quality = range
                .parameter("q")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (range, quality)
        })
        .filter(|(_, quality)| *quality > 0.0)
        .collect();
    ranges.sort_by(|(left, left_q), (right, right_q)| {
        right_q
            .total_cmp(left_q)
            .then_with(|| wildcards(left).cmp(&wildcards(right)))
    });
    ranges
}

/// 范围中的通配符个数：`type/subtype` 为 0，`type/*` 为 1，`*/*` 为 2。
fn wildcards(range: &MediaType) -> usize {
    usize::from(range.kind() == "*") + usize::from(range.subtype() == "*")
}
