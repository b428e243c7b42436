use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing type, inferred from the card text on the search page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AdKind {
    #[serde(rename = "sell")]
    Sale,
    #[serde(rename = "rent")]
    Rent,
}

impl fmt::Display for AdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdKind::Sale => f.write_str("sale"),
            AdKind::Rent => f.write_str("rent"),
        }
    }
}

/// A discovered ad that has not been processed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub ad_id: String,
    pub url: String,
    pub kind: AdKind,
}

/// Amenity flags. `None` means the page did not mention the amenity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Features {
    pub elevator: Option<bool>,
    pub parking: Option<bool>,
    pub warehouse: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    pub total_price: Option<i64>,
    pub price_per_meter: Option<i64>,
    pub floor: Option<i64>,
}

impl SaleDetails {
    /// Build sale details, deriving the price per square meter from the area.
    pub fn new(total_price: Option<i64>, floor: Option<i64>, area: Option<i64>) -> Self {
        let price_per_meter = match (total_price, area) {
            (Some(total), Some(area)) if area > 0 => Some(total.div_euclid(area)),
            _ => None,
        };
        Self {
            total_price,
            price_per_meter,
            floor,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RentDetails {
    pub deposit: Option<i64>,
    pub monthly_rent: Option<i64>,
}

/// Kind-specific fields, flattened into the submitted record
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AdDetails {
    Sale(SaleDetails),
    Rent(RentDetails),
}

/// Record forwarded to the collector
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAd {
    pub ad_type: AdKind,
    pub ad_id: String,
    pub ad_url: String,
    pub title: Option<String>,
    pub phone_number: String,
    pub time_ago: Option<String>,
    pub location: Option<String>,
    pub area: Option<i64>,
    pub build_year: Option<i64>,
    pub rooms: Option<i64>,
    pub features: Features,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
    #[serde(flatten)]
    pub details: AdDetails,
}

/// Why an ad was blacklisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    PhoneHidden,
    Manual,
    #[serde(other)]
    Other,
}

impl fmt::Display for BlacklistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlacklistReason::PhoneHidden => f.write_str("phone_hidden"),
            BlacklistReason::Manual => f.write_str("manual"),
            BlacklistReason::Other => f.write_str("other"),
        }
    }
}

/// Persisted rejection record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub ad_id: String,
    pub reason: BlacklistReason,
    pub added_at: DateTime<Utc>,
}

/// Last non-empty path segment of an ad link, ignoring scheme, host,
/// query and fragment.
pub fn ad_id_from_url(url: &str) -> Option<String> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let path = match url.split_once("//") {
        Some((scheme, rest)) if scheme.is_empty() || scheme.ends_with(':') => {
            rest.split_once('/').map_or("", |(_, path)| path)
        }
        _ => url,
    };
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ad_id_is_last_segment() {
        assert_eq!(
            ad_id_from_url("https://divar.ir/v/apartment-120m/AaBbCc12"),
            Some("AaBbCc12".to_string())
        );
        assert_eq!(ad_id_from_url("/v/title/XyZ/"), Some("XyZ".to_string()));
        assert_eq!(ad_id_from_url("/v/title/XyZ?ref=home"), Some("XyZ".to_string()));
        assert_eq!(ad_id_from_url("/"), None);
    }

    #[test]
    fn host_is_never_an_ad_id() {
        assert_eq!(ad_id_from_url("https://divar.ir/"), None);
        assert_eq!(ad_id_from_url("https://divar.ir"), None);
        assert_eq!(ad_id_from_url("https://divar.ir?x=1"), None);
        assert_eq!(
            ad_id_from_url("//divar.ir/v/x/AB12"),
            Some("AB12".to_string())
        );
    }

    #[test]
    fn price_per_meter_requires_positive_area() {
        assert_eq!(
            SaleDetails::new(Some(500_000_000), None, Some(100)).price_per_meter,
            Some(5_000_000)
        );
        assert_eq!(SaleDetails::new(Some(500_000_000), None, Some(0)).price_per_meter, None);
        assert_eq!(SaleDetails::new(Some(500_000_000), None, None).price_per_meter, None);
        assert_eq!(SaleDetails::new(None, None, Some(80)).price_per_meter, None);
        assert_eq!(SaleDetails::new(Some(1_000), None, Some(3)).price_per_meter, Some(333));
    }

    #[test]
    fn extracted_ad_serializes_flat_camel_case() {
        let ad = ExtractedAd {
            ad_type: AdKind::Rent,
            ad_id: "abc".into(),
            ad_url: "https://divar.ir/v/x/abc".into(),
            title: Some("title".into()),
            phone_number: "09120000000".into(),
            time_ago: None,
            location: None,
            area: Some(90),
            build_year: None,
            rooms: Some(2),
            features: Features::default(),
            description: None,
            category: None,
            images: vec![],
            details: AdDetails::Rent(RentDetails {
                deposit: Some(100),
                monthly_rent: None,
            }),
        };

        let value = serde_json::to_value(&ad).unwrap();
        assert_eq!(value["adType"], json!("rent"));
        assert_eq!(value["phoneNumber"], json!("09120000000"));
        assert_eq!(value["deposit"], json!(100));
        assert_eq!(value["monthlyRent"], json!(null));
        assert_eq!(value["buildYear"], json!(null));
        assert!(value.get("details").is_none());
        assert!(value.get("totalPrice").is_none());
    }

    #[test]
    fn unknown_blacklist_reason_reads_as_other() {
        let entry: BlacklistEntry = serde_json::from_value(json!({
            "adId": "q1",
            "reason": "duplicate",
            "addedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(entry.reason, BlacklistReason::Other);
    }
}
