//! Per-family rewrites applied to list items before they reach the browser.

use serde_json::Value;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    None,
    /// String fields holding a backend-relative asset path.
    AbsoluteAssetUrls(&'static [&'static str]),
}

impl Projection {
    pub fn apply(&self, item: Value, origin: &Url) -> Value {
        match self {
            Projection::None => item,
            Projection::AbsoluteAssetUrls(fields) => {
                let Value::Object(mut object) = item else {
                    return item;
                };
                for field in *fields {
                    if let Some(Value::String(raw)) = object.get_mut(*field)
                        && !raw.trim().is_empty()
                    {
                        *raw = absolutize_asset_url(raw, origin);
                    }
                }
                Value::Object(object)
            }
        }
    }
}

/// Resolves a relative asset path against the backend origin.
///
/// Values that are already absolute (`http(s)://`, protocol-relative or
/// `data:`) are returned unchanged, so the rewrite is idempotent.
pub fn absolutize_asset_url(raw: &str, origin: &Url) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || trimmed.starts_with("//")
    {
        return raw.to_string();
    }

    format!(
        "{}/{}",
        origin.as_str().trim_end_matches('/'),
        trimmed.trim_start_matches('/')
    )
}
