//! Reshapes research API payloads into [`TrendEntry`] values.
//!
//! Payloads differ in where they keep the trend array, how they name the
//! description and how they express images. Each of those is resolved by a
//! fixed list of named strategies, tried in order; a strategy that does not
//! apply returns `None` and the next one is tried.
//!
//! Truncation keeps the last `N` raw items and numbering always restarts at 1
//! over what was kept, so `number` is the position in the returned list.

use crate::domain::trend_entry::{TrendEntry, TrendsReport};
use crate::domain::trends_research::TrendsError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendArrayLocation {
    /// `data.trends`
    NestedTrends,
    /// `trends`
    TopLevelTrends,
    /// `data.categories`, as returned by the overview endpoint.
    NestedCategories,
    /// `categories`
    TopLevelCategories,
}

impl TrendArrayLocation {
    pub const SEARCH_ORDER: [TrendArrayLocation; 4] = [
        TrendArrayLocation::NestedTrends,
        TrendArrayLocation::TopLevelTrends,
        TrendArrayLocation::NestedCategories,
        TrendArrayLocation::TopLevelCategories,
    ];

    pub fn extract<'a>(&self, payload: &'a Value) -> Option<&'a [Value]> {
        let array = match self {
            TrendArrayLocation::NestedTrends => payload.get("data")?.get("trends")?,
            TrendArrayLocation::TopLevelTrends => payload.get("trends")?,
            TrendArrayLocation::NestedCategories => payload.get("data")?.get("categories")?,
            TrendArrayLocation::TopLevelCategories => payload.get("categories")?,
        };
        array.as_array().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionField {
    /// `description_translated`, set by the overview endpoint. Blank values
    /// do not apply.
    Translated,
    English,
    Generic,
}

impl DescriptionField {
    pub const SEARCH_ORDER: [DescriptionField; 3] = [
        DescriptionField::Translated,
        DescriptionField::English,
        DescriptionField::Generic,
    ];

    pub fn extract<'a>(&self, item: &'a Value) -> Option<&'a str> {
        match self {
            DescriptionField::Translated => item
                .get("description_translated")?
                .as_str()
                .filter(|text| !text.trim().is_empty()),
            DescriptionField::English => item.get("description_english")?.as_str(),
            DescriptionField::Generic => item.get("description")?.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// `image_urls: ["https://..."]`
    UrlList,
    /// `images: [{"url": "https://..."}]`
    ImageObjects,
    /// `image_url: "https://..."`
    SingleUrl,
}

impl ImageSource {
    pub const SEARCH_ORDER: [ImageSource; 3] = [
        ImageSource::UrlList,
        ImageSource::ImageObjects,
        ImageSource::SingleUrl,
    ];

    pub fn extract(&self, item: &Value) -> Option<Vec<String>> {
        match self {
            ImageSource::UrlList => Some(string_array(item.get("image_urls")?.as_array()?)),
            ImageSource::ImageObjects => Some(
                item.get("images")?
                    .as_array()?
                    .iter()
                    .filter_map(|image| image.get("url").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
            ),
            ImageSource::SingleUrl => item
                .get("image_url")?
                .as_str()
                .filter(|url| !url.trim().is_empty())
                .map(|url| vec![url.to_string()]),
        }
    }
}

/// Parses a raw response body. Only malformed JSON is an error; any well
/// formed document is handed to the normalizer as is.
pub fn parse_payload(body: &str) -> Result<Value, TrendsError> {
    serde_json::from_str(body).map_err(|e| TrendsError::InvalidResponseFormat(e.to_string()))
}

pub fn locate_trend_array(payload: &Value) -> Option<(TrendArrayLocation, &[Value])> {
    TrendArrayLocation::SEARCH_ORDER
        .iter()
        .find_map(|location| location.extract(payload).map(|items| (*location, items)))
}

/// Normalizes every trend of `payload`, optionally keeping only the last
/// `keep_last` of them.
pub fn normalize_trends(payload: &Value, keep_last: Option<usize>) -> Vec<TrendEntry> {
    let raw = locate_trend_array(payload)
        .map(|(_, items)| items)
        .unwrap_or(&[]);

    let start = keep_last
        .map(|count| raw.len().saturating_sub(count))
        .unwrap_or(0);

    raw[start..]
        .iter()
        .enumerate()
        .map(|(index, item)| normalize_entry(index + 1, item))
        .collect()
}

pub fn normalize_report(payload: &Value, keep_last: Option<usize>) -> TrendsReport {
    TrendsReport {
        trends: normalize_trends(payload, keep_last),
        generated_at: first_string(
            payload,
            &[&["request_info", "generated_at"], &["data", "generated_at"], &["generated_at"]],
        ),
        research_model: first_string(payload, &[&["data", "research_model"], &["research_model"]]),
        language: first_string(payload, &[&["request_info", "language"], &["language"]]),
    }
}

fn normalize_entry(number: usize, item: &Value) -> TrendEntry {
    let description = DescriptionField::SEARCH_ORDER
        .iter()
        .find_map(|field| field.extract(item))
        .unwrap_or_default()
        .to_string();

    let references = item
        .get("references")
        .and_then(Value::as_array)
        .map(|references| string_array(references))
        .unwrap_or_default();

    let image_prompts = item
        .get("image_prompts")
        .and_then(Value::as_array)
        .map(|prompts| string_array(prompts))
        .unwrap_or_default();

    let image_urls = ImageSource::SEARCH_ORDER
        .iter()
        .find_map(|source| source.extract(item))
        .unwrap_or_default();

    TrendEntry::new(number, description, references, image_prompts, image_urls)
        .with_category_name(category_name(item))
}

/// `category_name`, or else `category_id` with dashes read as spaces.
fn category_name(item: &Value) -> Option<String> {
    let named = item
        .get("category_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());

    named.map(str::to_string).or_else(|| {
        item.get("category_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| id.replace('-', " "))
    })
}

fn string_array(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

fn first_string(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(payload, |value, key| value.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}
