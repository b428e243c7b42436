use crate::blacklist::BlacklistStore;
use crate::error::ExtractError;
use crate::models::{
    ad_id_from_url, AdDetails, AdKind, BlacklistReason, ExtractedAd, Features, RentDetails,
    SaleDetails,
};
use crate::normalize::normalize_owned;
use crate::scrapers::contact::{reveal_contact, RevealStatus, RevealTiming};
use crate::scrapers::selectors::{self as sel};
use crate::scrapers::traits::{RenderSession, RenderedPage};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    /// Wait for the ad title before giving up on the page
    pub content_wait: Duration,
    pub reveal: RevealTiming,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            content_wait: Duration::from_secs(10),
            reveal: RevealTiming::default(),
        }
    }
}

/// Opens an ad page, reveals the phone number and extracts a record.
///
/// Exclusion of already-known ids is the caller's job; the extractor
/// processes whatever URL it is given.
pub struct AdExtractor {
    session: Arc<dyn RenderSession>,
    blacklist: BlacklistStore,
    config: ExtractorConfig,
}

impl AdExtractor {
    pub fn new(
        session: Arc<dyn RenderSession>,
        blacklist: BlacklistStore,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            session,
            blacklist,
            config,
        }
    }

    /// Extract one ad. `Ok(None)` means the ad was rejected on purpose
    /// (hidden phone, now blacklisted) and must not be submitted.
    pub async fn extract(
        &self,
        url: &str,
        kind: AdKind,
    ) -> Result<Option<ExtractedAd>, ExtractError> {
        let ad_id = ad_id_from_url(url).ok_or_else(|| ExtractError::InvalidUrl(url.to_string()))?;

        let page = self
            .session
            .open_page()
            .await
            .map_err(|e| ExtractError::Open {
                url: url.to_string(),
                message: format!("{e:#}"),
            })?;

        let result = self.extract_on_page(page.as_ref(), url, &ad_id, kind).await;

        if let Err(e) = page.close().await {
            warn!(ad_id = %ad_id, error = %e, "Failed to close ad page");
        }
        result
    }

    async fn extract_on_page(
        &self,
        page: &dyn RenderedPage,
        url: &str,
        ad_id: &str,
        kind: AdKind,
    ) -> Result<Option<ExtractedAd>, ExtractError> {
        info!("🔍 Opening {} ad {}...", kind, ad_id);

        page.navigate(url).await.map_err(|e| ExtractError::Open {
            url: url.to_string(),
            message: format!("{e:#}"),
        })?;

        page.wait_for(sel::TITLE, self.config.content_wait)
            .await
            .map_err(|e| ExtractError::ContentMissing(format!("{e:#}")))?;

        if reveal_contact(page, &self.config.reveal).await? == RevealStatus::Hidden {
            info!(ad_id, "❌ Phone number is hidden, rejecting ad");
            self.blacklist.add(ad_id, BlacklistReason::PhoneHidden).await?;
            return Ok(None);
        }
        info!(ad_id, "✅ Phone number revealed");

        let html = page
            .content()
            .await
            .map_err(|e| ExtractError::Document(format!("{e:#}")))?;

        let ad = parse_ad(&html, kind, ad_id, url)?;
        debug!(ad_id, title = ?ad.title, area = ?ad.area, "Extracted ad");
        Ok(Some(ad))
    }
}

/// Fields shared by sale and rent ads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonFields {
    pub title: Option<String>,
    pub phone_number: Option<String>,
    pub time_ago: Option<String>,
    pub location: Option<String>,
    pub area: Option<i64>,
    pub build_year: Option<i64>,
    pub rooms: Option<i64>,
    pub features: Features,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
}

/// Build the full record from a revealed ad page.
pub fn parse_ad(html: &str, kind: AdKind, ad_id: &str, url: &str) -> Result<ExtractedAd, ExtractError> {
    let doc = Html::parse_document(html);
    let common = parse_common(&doc)?;

    let phone_number = common.phone_number.ok_or(ExtractError::MissingPhone)?;

    let details = match kind {
        AdKind::Sale => AdDetails::Sale(parse_sale(&doc, common.area)?),
        AdKind::Rent => AdDetails::Rent(parse_rent(&doc)?),
    };

    Ok(ExtractedAd {
        ad_type: kind,
        ad_id: ad_id.to_string(),
        ad_url: url.to_string(),
        title: common.title,
        phone_number,
        time_ago: common.time_ago,
        location: common.location,
        area: common.area,
        build_year: common.build_year,
        rooms: common.rooms,
        features: common.features,
        description: common.description,
        category: common.category,
        images: common.images,
        details,
    })
}

pub fn parse_common(doc: &Html) -> Result<CommonFields, ExtractError> {
    let mut fields = CommonFields {
        title: first_text(doc, sel::TITLE)?,
        ..Default::default()
    };

    fields.phone_number = doc
        .select(&selector(sel::PHONE_LINK)?)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim_start_matches("tel:").trim().to_string())
        .filter(|phone| !phone.is_empty());

    if let Some(subtitle) = first_text(doc, sel::SUBTITLE)? {
        let mut parts = subtitle.split(sel::TIME_LOCATION_SEPARATOR);
        fields.time_ago = parts.next().map(|s| s.trim().to_string());
        fields.location = parts.next().map(|s| s.trim().to_string());
    }

    if let Some(table) = doc.select(&selector(sel::GROUP_TABLE)?).next() {
        let (headers, values) = table_columns(table)?;
        let lookup = |label: &str| {
            headers
                .iter()
                .position(|h| h == label)
                .and_then(|i| values.get(i).cloned())
        };
        fields.area = normalize_owned(&lookup(sel::LABEL_AREA));
        fields.build_year = normalize_owned(&lookup(sel::LABEL_BUILD_YEAR));
        fields.rooms = normalize_owned(&lookup(sel::LABEL_ROOMS));
    }

    fields.features = parse_features(doc)?;
    fields.description = parse_description(doc)?;
    fields.category = doc
        .select(&selector(sel::BREADCRUMB_CATEGORY)?)
        .last()
        .map(element_text);
    fields.images = parse_images(doc)?;

    Ok(fields)
}

/// Total price and floor from the labelled rows.
pub fn parse_sale(doc: &Html, area: Option<i64>) -> Result<SaleDetails, ExtractError> {
    let rows = label_rows(doc)?;
    let value_of = |label: &str| {
        rows.iter()
            .find(|(title, _)| title == label)
            .map(|(_, value)| value.clone())
    };

    Ok(SaleDetails::new(
        normalize_owned(&value_of(sel::LABEL_TOTAL_PRICE)),
        normalize_owned(&value_of(sel::LABEL_FLOOR)),
        area,
    ))
}

/// Deposit and monthly rent, from labelled rows first and then from a
/// table whose headers mention both.
pub fn parse_rent(doc: &Html) -> Result<RentDetails, ExtractError> {
    let mut deposit = None;
    let mut monthly_rent = None;

    for (title, value) in label_rows(doc)? {
        if title == sel::LABEL_DEPOSIT {
            deposit = Some(value);
        } else if title.contains(sel::LABEL_RENT) && title.contains(sel::LABEL_MONTHLY) {
            monthly_rent = Some(value);
        }
    }

    if deposit.is_none() || monthly_rent.is_none() {
        for table in doc.select(&selector(sel::GROUP_TABLE)?) {
            let (headers, values) = table_columns(table)?;
            let deposit_idx = headers.iter().position(|h| h.contains(sel::LABEL_DEPOSIT));
            let rent_idx = headers.iter().position(|h| h.contains(sel::LABEL_RENT));

            let (Some(deposit_idx), Some(rent_idx)) = (deposit_idx, rent_idx) else {
                continue;
            };

            let non_empty = |i: usize| values.get(i).filter(|v| !v.is_empty()).cloned();
            if deposit.is_none() {
                deposit = non_empty(deposit_idx);
            }
            if monthly_rent.is_none() {
                monthly_rent = non_empty(rent_idx);
            }
        }
    }

    debug!(?deposit, ?monthly_rent, "Raw rent values");

    Ok(RentDetails {
        deposit: normalize_owned(&deposit),
        monthly_rent: normalize_owned(&monthly_rent),
    })
}

fn parse_features(doc: &Html) -> Result<Features, ExtractError> {
    let mut features = Features::default();
    let cell_selector = selector(sel::FEATURE_CELL)?;

    for table in doc.select(&selector(sel::GROUP_TABLE)?) {
        for cell in table.select(&cell_selector) {
            let text = element_text(cell);
            let available = !cell
                .value()
                .classes()
                .any(|class| class == sel::DISABLED_CLASS);

            if text.contains(sel::LABEL_ELEVATOR) {
                features.elevator = Some(available);
            }
            if text.contains(sel::LABEL_PARKING) {
                features.parking = Some(available);
            }
            if text.contains(sel::LABEL_WAREHOUSE) {
                features.warehouse = Some(available);
            }
        }
    }

    Ok(features)
}

fn parse_description(doc: &Html) -> Result<Option<String>, ExtractError> {
    let heading = selector(sel::SECTION_HEADING)?;
    let paragraph = selector(sel::DESCRIPTION)?;

    for section in doc.select(&selector(sel::SECTION)?) {
        let is_description = section
            .select(&heading)
            .next()
            .is_some_and(|h| element_text(h) == sel::LABEL_DESCRIPTION);
        if !is_description {
            continue;
        }

        if let Some(p) = section.select(&paragraph).next() {
            let text = element_text(p);
            if !text.is_empty() && text != sel::EMPTY_DESCRIPTION {
                return Ok(Some(text));
            }
        }
    }

    Ok(None)
}

/// High-resolution post images, or any non-thumbnail CDN image as a fallback.
fn parse_images(doc: &Html) -> Result<Vec<String>, ExtractError> {
    let sources: Vec<&str> = doc
        .select(&selector(sel::CDN_IMAGE)?)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .collect();

    let mut images = unique(sources.iter().copied().filter(|s| s.contains(sel::HIGH_RES_MARKER)));
    if images.is_empty() {
        images = unique(sources.iter().copied().filter(|s| !s.contains(sel::THUMBNAIL_MARKER)));
    }
    Ok(images)
}

fn unique<'a>(sources: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for src in sources {
        if !out.iter().any(|s| s == src) {
            out.push(src.to_string());
        }
    }
    out
}

/// `(title, value)` pairs from the unexpandable label rows.
fn label_rows(doc: &Html) -> Result<Vec<(String, String)>, ExtractError> {
    let title = selector(sel::ROW_TITLE)?;
    let value = selector(sel::ROW_VALUE)?;

    Ok(doc
        .select(&selector(sel::ROW)?)
        .filter_map(|row| {
            let t = row.select(&title).next()?;
            let v = row.select(&value).next()?;
            Some((element_text(t), element_text(v)))
        })
        .collect())
}

fn table_columns(table: ElementRef<'_>) -> Result<(Vec<String>, Vec<String>), ExtractError> {
    let headers = table
        .select(&selector(sel::TABLE_HEADER)?)
        .map(element_text)
        .collect();
    let values = table
        .select(&selector(sel::TABLE_VALUE)?)
        .map(element_text)
        .collect();
    Ok((headers, values))
}

fn first_text(doc: &Html, css: &str) -> Result<Option<String>, ExtractError> {
    Ok(doc.select(&selector(css)?).next().map(element_text))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    sel::parse(css).map_err(|e| ExtractError::Document(e.to_string()))
}
