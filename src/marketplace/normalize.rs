//! Defensive normalization of raw marketplace items into [`Product`].
//!
//! Every upstream field is optional. Each logical field is looked up under an
//! ordered list of alternate keys (dotted keys reach into nested objects) and
//! falls back to the default listed next to it.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::currency::CurrencyConverter;
use crate::model::{Price, Product, Supplier};

// Field                 Keys, in priority order                                              Default
const ID_KEYS: &[&str] = &["item_id", "offer_id", "offerId", "num_iid", "id"]; //              synthetic-<uuid>
const TITLE_KEYS: &[&str] = &["title", "subject", "name"]; //                                   ""
const PRICE_KEYS: &[&str] = &[ //                                                               0
    "price_info.sale_price", "sale_price",
    "price_info.wholesale_price", "wholesale_price",
    "price_info.origin_price", "origin_price",
    "price_info.price", "price",
];
const MOQ_KEYS: &[&str] = &["quantity_begin", "moq", "min_order", "minOrder", "sale_info.min_order"]; // 1
const SOLD_KEYS: &[&str] = &[ //                                                                0
    "sale_info.sale_quantity", "sale_quantity", "sold", "sales_count", "salesCount",
];
const REPURCHASE_KEYS: &[&str] = &["shop_info.repurchase_rate", "repurchase_rate", "repurchaseRate"]; // none
const SUPPLIER_NAME_KEYS: &[&str] = &[ //                                                        ""
    "shop_info.company_name", "shop_info.shop_name", "company_name", "supplier_name", "supplierName", "companyName",
];
const LOCATION_KEYS: &[&str] = &[ //                                                             ""
    "shop_info.location", "location", "supplier_location", "supplierLocation", "shop_info.province", "province",
];
const YEARS_KEYS: &[&str] = &["shop_info.shop_years", "shop_info.tp_year", "years_on_platform", "yearsOnPlatform"]; // none
const RATING_KEYS: &[&str] = &["shop_info.score", "shop_info.rating", "supplier_rating", "supplierRating", "rating"]; // none
const VERIFIED_KEYS: &[&str] = &[ //                                                             false
    "shop_info.is_verified", "shop_info.is_super_factory", "is_verified", "isVerified", "verified",
];
const IMAGE_KEYS: &[&str] = &["img", "image_url", "imageUrl", "image", "main_image", "pic_url"]; // ""
const URL_KEYS: &[&str] = &["product_url", "detail_url", "detailUrl", "productUrl", "url"]; //   from template

/// Outcome of normalizing one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Parsed(Product),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The record is not a JSON object
    NotAnObject,
    /// Neither an identifier nor a title is present
    MissingIdentity,
}

pub struct Normalizer {
    converter: CurrencyConverter,
    detail_url_template: String,
}

impl Normalizer {
    pub fn new(converter: CurrencyConverter, detail_url_template: &str) -> Self {
        Self {
            converter,
            detail_url_template: detail_url_template.to_string(),
        }
    }

    pub fn normalize(&self, raw: &Value) -> Normalized {
        if !raw.is_object() {
            return Normalized::Dropped(DropReason::NotAnObject);
        }

        let upstream_id = lookup(raw, ID_KEYS).and_then(as_text);
        let title = lookup(raw, TITLE_KEYS).and_then(as_text);
        if upstream_id.is_none() && title.is_none() {
            return Normalized::Dropped(DropReason::MissingIdentity);
        }
        let title = title.unwrap_or_default();

        let (min, max) = lookup(raw, PRICE_KEYS)
            .and_then(parse_price_range)
            .unwrap_or((0.0, 0.0));
        let price = Price {
            min,
            max,
            currency_code: self.converter.source_code().to_string(),
        };
        let price_converted = self.converter.convert_price(&price);

        let minimum_order_quantity = lookup(raw, MOQ_KEYS)
            .and_then(as_number)
            .map(|moq| moq.max(1.0).min(u32::MAX as f64) as u32)
            .unwrap_or(1);

        let units_sold = lookup(raw, SOLD_KEYS).and_then(parse_count).unwrap_or(0);
        let repurchase_rate = lookup(raw, REPURCHASE_KEYS).and_then(parse_percentage);

        let supplier_name = lookup(raw, SUPPLIER_NAME_KEYS).and_then(as_text).unwrap_or_default();
        let location = lookup(raw, LOCATION_KEYS).and_then(as_location).unwrap_or_default();
        let supplier = Supplier {
            name: supplier_name.clone(),
            name_native: supplier_name,
            location: location.clone(),
            location_native: location,
            years_on_platform: lookup(raw, YEARS_KEYS)
                .and_then(as_number)
                .filter(|years| *years >= 0.0)
                .map(|years| years as u32),
            rating: lookup(raw, RATING_KEYS).and_then(as_number).filter(|r| *r >= 0.0),
            verified: lookup(raw, VERIFIED_KEYS).map(as_flag).unwrap_or(false),
        };

        let image_url = lookup(raw, IMAGE_KEYS)
            .and_then(as_text)
            .map(|url| upgrade_to_https(&url))
            .unwrap_or_default();

        let product_url = match lookup(raw, URL_KEYS).and_then(as_text) {
            Some(url) => upgrade_to_https(&url),
            None => upstream_id
                .as_deref()
                .map(|id| self.detail_url_template.replace("{id}", id))
                .unwrap_or_default(),
        };

        let id = upstream_id.unwrap_or_else(|| format!("synthetic-{}", Uuid::new_v4()));

        Normalized::Parsed(Product {
            id,
            title: title.clone(),
            title_native: title,
            price,
            price_converted,
            minimum_order_quantity,
            units_sold,
            repurchase_rate,
            supplier,
            image_url,
            product_url,
        })
    }

    /// Normalize a page of raw items, dropping unusable records
    pub fn normalize_all(&self, raw_items: &[Value]) -> Vec<Product> {
        let mut products = Vec::with_capacity(raw_items.len());
        let mut dropped = 0;
        for raw in raw_items {
            match self.normalize(raw) {
                Normalized::Parsed(product) => products.push(product),
                Normalized::Dropped(reason) => {
                    dropped += 1;
                    debug!("Dropped marketplace record ({:?}): {}", reason, truncate_for_log(raw));
                }
            }
        }
        if dropped > 0 {
            debug!("Normalized {} items, dropped {}", products.len(), dropped);
        }
        products
    }
}

/// First present, non-null, non-blank value among `keys`
fn lookup<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        let value = key
            .split('.')
            .try_fold(item, |current, part| current.get(part))?;
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            _ => Some(value),
        }
    })
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_location(value: &Value) -> Option<String> {
    match value {
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(as_text)
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined).filter(|s| !s.is_empty())
        }
        other => as_text(other),
    }
}

fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "y" | "yes"),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Numbers, numeric strings, and `lo-hi` / `lo~hi` range strings
fn parse_price_range(value: &Value) -> Option<(f64, f64)> {
    if let Value::String(s) = value {
        let s = s.trim();
        let separator = s.char_indices().skip(1).find(|(_, c)| *c == '-' || *c == '~');
        if let Some((at, sep)) = separator {
            let lo = parse_decimal(&s[..at]);
            let hi = parse_decimal(&s[at + sep.len_utf8()..]);
            return match (lo, hi) {
                (Some(lo), Some(hi)) => Some((lo, hi)),
                (Some(v), None) | (None, Some(v)) => Some((v, v)),
                (None, None) => None,
            };
        }
    }
    as_number(value).map(|v| (v, v))
}

/// Plain counts and abbreviated counts such as `1万+`, `3千`, `2.5k`, `1,234`
pub fn parse_count(value: &Value) -> Option<u64> {
    let text = match value {
        Value::Number(n) => return n.as_f64().filter(|n| n.is_finite()).map(|n| n.max(0.0) as u64),
        Value::String(s) => s.trim(),
        _ => return None,
    };

    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let numeric_len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(rest.len());
    let number = parse_decimal(&rest[..numeric_len])?;

    let multiplier = match rest[numeric_len..].trim_start().chars().next() {
        Some('万') | Some('w') | Some('W') => 10_000.0,
        Some('千') | Some('k') | Some('K') => 1_000.0,
        Some('亿') => 100_000_000.0,
        _ => 1.0,
    };

    Some((number * multiplier).max(0.0).round() as u64)
}

/// `45%`, `"45"` or `45`, clamped into 0..=100
pub fn parse_percentage(value: &Value) -> Option<f64> {
    let number = match value {
        Value::String(s) => parse_decimal(s.trim().trim_end_matches('%')),
        other => as_number(other),
    }?;
    number.is_finite().then(|| number.clamp(0.0, 100.0))
}

pub fn upgrade_to_https(url: &str) -> String {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}

fn truncate_for_log(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(200) {
        Some((at, _)) => format!("{}...", &text[..at]),
        None => text,
    }
}
