//! Response classification and normalization.
//!
//! The products endpoint has been seen to answer with several different
//! JSON layouts. [`classify`] sorts a payload into exactly one
//! [`ResponseShape`], checking keys in a fixed priority order, and
//! [`normalize`] turns that into a uniform [`NormalizedPage`].

use link_corridor_geometry_models::BoundingBox;
use link_corridor_search_models::{SearchItem, SearchSource};
use serde::Serialize;
use serde_json::{Map, Value};
use strum_macros::IntoStaticStr;

use crate::projects::{file_name_from_url, project_name};

/// Keys that mark an object as a product record.
const ITEM_KEYS: &[&str] = &["sourceId", "downloadURL", "title"];

/// Keys that mark an array element as a product record during the
/// last-resort scan.
const SCAN_ITEM_KEYS: &[&str] = &["sourceId", "title", "downloadURL", "id"];

/// The layouts a products response can take.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ResponseShape {
    /// `{"items": [...], "total": n}`, the documented layout.
    Items { items: Vec<Value>, total: Option<u64> },
    /// A top-level array of products.
    BareArray(Vec<Value>),
    /// One product object on its own.
    SingleItem(Map<String, Value>),
    /// `{"results": [...]}` or `{"results": {"items": [...]}}`.
    Results { items: Vec<Value>, total: Option<u64> },
    /// `{"data": [...]}` or `{"data": {"items": [...]}}`.
    Data { items: Vec<Value>, total: Option<u64> },
    /// `{"products": [...]}`.
    Products(Vec<Value>),
    /// `{"error": ...}` or `{"errorMessage": ...}`.
    Error(String),
    /// `null` or `{}`.
    Empty,
    /// Found by scanning top-level values for an array of products.
    Discovered { key: String, items: Vec<Value> },
    /// Nothing recognizable.
    Unrecognized,
}

impl ResponseShape {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

fn total_of(obj: &Map<String, Value>) -> Option<u64> {
    obj.get("total").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// `(items, total)` from a wrapper value that is either an array or an
/// object with an `items` array.
fn unwrap_nested(value: &Value) -> (Vec<Value>, Option<u64>) {
    match value {
        Value::Array(items) => (items.clone(), None),
        Value::Object(inner) => match inner.get("items") {
            Some(Value::Array(items)) => (items.clone(), total_of(inner)),
            _ => (Vec::new(), None),
        },
        _ => (Vec::new(), None),
    }
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sorts a raw payload into one [`ResponseShape`].
#[must_use]
pub fn classify(raw: &Value) -> ResponseShape {
    let obj = match raw {
        Value::Array(items) => return ResponseShape::BareArray(items.clone()),
        Value::Null => return ResponseShape::Empty,
        Value::Object(obj) => obj,
        _ => return ResponseShape::Unrecognized,
    };

    if let Some(items) = obj.get("items") {
        let items = items.as_array().cloned().unwrap_or_default();
        return ResponseShape::Items {
            items,
            total: total_of(obj),
        };
    }

    if ITEM_KEYS.iter().any(|k| obj.contains_key(*k)) {
        return ResponseShape::SingleItem(obj.clone());
    }

    if let Some(results) = obj.get("results") {
        let (items, total) = unwrap_nested(results);
        return ResponseShape::Results { items, total };
    }

    if let Some(data) = obj.get("data") {
        let (items, total) = unwrap_nested(data);
        return ResponseShape::Data { items, total };
    }

    if let Some(products) = obj.get("products") {
        return ResponseShape::Products(products.as_array().cloned().unwrap_or_default());
    }

    if let Some(error) = obj.get("error").or_else(|| obj.get("errorMessage")) {
        return ResponseShape::Error(error_text(error));
    }

    if obj.is_empty() {
        return ResponseShape::Empty;
    }

    for (key, value) in obj {
        if let Value::Array(items) = value
            && let Some(Value::Object(sample)) = items.first()
            && SCAN_ITEM_KEYS.iter().any(|k| sample.contains_key(*k))
        {
            return ResponseShape::Discovered {
                key: key.clone(),
                items: items.clone(),
            };
        }
    }

    ResponseShape::Unrecognized
}

/// Outcome of a page as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    /// The service answered with an error object.
    RemoteError(String),
    /// The payload parsed but matched no known layout.
    Unrecognized(String),
}

/// A TNM product record with its field-name variants resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TnmProduct {
    pub source_id: String,
    pub title: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    pub size_in_bytes: u64,
    pub format: String,
    pub publication_date: String,
    pub bounding_box: Option<BoundingBox>,
    pub meta_url: String,
    pub source_name: String,
    pub source_origin_name: String,
    /// Every field not consumed above.
    pub extra: Map<String, Value>,
}

const CONSUMED_KEYS: &[&str] = &[
    "sourceId",
    "id",
    "title",
    "name",
    "downloadURL",
    "url",
    "download_url",
    "sizeInBytes",
    "size",
    "format",
    "publicationDate",
    "date",
    "boundingBox",
    "bbox",
    "metaUrl",
    "metadata_url",
    "sourceName",
    "sourceOriginName",
];

/// First non-empty string (or number, rendered) among `keys`.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn size_field(obj: &Map<String, Value>) -> u64 {
    ["sizeInBytes", "size"]
        .iter()
        .find_map(|k| match obj.get(*k)? {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}

fn bbox_field(obj: &Map<String, Value>) -> Option<BoundingBox> {
    let value = obj.get("boundingBox").or_else(|| obj.get("bbox"))?;
    match value {
        Value::Object(b) => {
            let get = |k: &str| b.get(k).and_then(Value::as_f64);
            Some(BoundingBox {
                min_lon: get("minX")?,
                min_lat: get("minY")?,
                max_lon: get("maxX")?,
                max_lat: get("maxY")?,
            })
        }
        Value::Array(values) if values.len() == 4 => {
            let v: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            (v.len() == 4).then(|| BoundingBox {
                min_lon: v[0],
                min_lat: v[1],
                max_lon: v[2],
                max_lat: v[3],
            })
        }
        _ => None,
    }
}

impl TnmProduct {
    /// Reads one product, filling gaps from alternate field names.
    /// `index` is the item's position in the whole result set and only
    /// used to label records that carry no identifier at all.
    #[must_use]
    pub fn from_object(obj: &Map<String, Value>, index: usize) -> Self {
        let download_url = text_field(obj, &["downloadURL", "url", "download_url"]).unwrap_or_default();
        let source_id = text_field(obj, &["sourceId", "id"])
            .or_else(|| (!download_url.is_empty()).then(|| download_url.clone()))
            .unwrap_or_else(|| format!("TNM_ITEM_{index}"));

        let extra = obj
            .iter()
            .filter(|(k, _)| !CONSUMED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            source_id,
            title: text_field(obj, &["title", "name"])
                .unwrap_or_else(|| format!("TNM Item {}", index + 1)),
            download_url,
            size_in_bytes: size_field(obj),
            format: text_field(obj, &["format"]).unwrap_or_else(|| "Unknown".to_string()),
            publication_date: text_field(obj, &["publicationDate", "date"]).unwrap_or_default(),
            bounding_box: bbox_field(obj),
            meta_url: text_field(obj, &["metaUrl", "metadata_url"]).unwrap_or_default(),
            source_name: text_field(obj, &["sourceName"]).unwrap_or_else(|| "TNM".to_string()),
            source_origin_name: text_field(obj, &["sourceOriginName"])
                .unwrap_or_else(|| "USGS TNM".to_string()),
            extra,
        }
    }

    /// Project key derived from the download file name.
    #[must_use]
    pub fn project(&self) -> Option<String> {
        file_name_from_url(&self.download_url).map(project_name)
    }

    /// Normalizes into a [`SearchItem`].
    #[must_use]
    pub fn to_search_item(&self) -> SearchItem {
        let mut item = SearchItem::new(SearchSource::Lidar, &self.source_id, &self.title)
            .with_attribute("downloadURL", self.download_url.as_str())
            .with_attribute("sizeInBytes", self.size_in_bytes)
            .with_attribute("format", self.format.as_str())
            .with_attribute("publicationDate", self.publication_date.as_str())
            .with_attribute("metaUrl", self.meta_url.as_str())
            .with_attribute("sourceName", self.source_name.as_str())
            .with_attribute("sourceOriginName", self.source_origin_name.as_str())
            .with_attribute("project", self.project());
        if let Some(bounds) = self.bounding_box {
            item = item.with_bounds(bounds);
        }
        item
    }
}

/// A page reduced to products, the service-reported total, and status.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPage {
    pub items: Vec<TnmProduct>,
    /// Total reported by the service, or the page's own item count when
    /// the layout carries none.
    pub total: u64,
    pub status: PageStatus,
}

/// Classifies and normalizes a payload. `offset` is the position of the
/// page's first item in the whole result set.
#[must_use]
pub fn normalize(raw: &Value, offset: usize) -> NormalizedPage {
    let shape = classify(raw);
    log::debug!("Products response layout: {}", shape.kind());

    let (items, total, status) = match shape {
        ResponseShape::Items { items, total }
        | ResponseShape::Results { items, total }
        | ResponseShape::Data { items, total } => (items, total, PageStatus::Ok),
        ResponseShape::BareArray(items)
        | ResponseShape::Products(items)
        | ResponseShape::Discovered { items, .. } => (items, None, PageStatus::Ok),
        ResponseShape::SingleItem(obj) => (vec![Value::Object(obj)], None, PageStatus::Ok),
        ResponseShape::Empty => (Vec::new(), Some(0), PageStatus::Ok),
        ResponseShape::Error(message) => {
            log::warn!("Products service returned an error: {message}");
            (Vec::new(), Some(0), PageStatus::RemoteError(message))
        }
        ResponseShape::Unrecognized => {
            let summary = match raw {
                Value::Object(obj) => format!(
                    "object with keys [{}]",
                    obj.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                ),
                other => format!("unexpected JSON value {other}"),
            };
            log::warn!("Products response has no recognizable layout: {summary}");
            (Vec::new(), Some(0), PageStatus::Unrecognized(summary))
        }
    };

    let mut products = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(obj) => products.push(TnmProduct::from_object(obj, offset + i)),
            other => log::warn!("Skipping non-object product entry {i}: {other}"),
        }
    }

    let total = total.unwrap_or(products.len() as u64);

    NormalizedPage {
        items: products,
        total,
        status,
    }
}
