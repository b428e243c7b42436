//! CSS selectors and Persian labels used on the listing and ad pages.

use anyhow::{anyhow, Result};
use scraper::Selector;

// Search results
pub const CARD: &str = "article.kt-post-card";
pub const CARD_LINK: &str = "article.kt-post-card a.kt-post-card__action";
pub const CARD_ACTION: &str = "a.kt-post-card__action";

// Ad page
pub const TITLE: &str = "h1";
pub const SUBTITLE: &str = "h1 + div.kt-page-title__subtitle";
pub const CONTACT_BUTTON: &str = "button.post-actions__get-contact";
pub const PHONE_LINK: &str = r#"a[href^="tel:"]"#;
pub const GROUP_TABLE: &str = "table.kt-group-row";
pub const TABLE_HEADER: &str = "thead th";
pub const TABLE_VALUE: &str = "tbody td";
pub const FEATURE_CELL: &str = "td.kt-group-row-item__value";
pub const DISABLED_CLASS: &str = "kt-group-row-item--disabled";
pub const ROW: &str = ".kt-unexpandable-row";
pub const ROW_TITLE: &str = ".kt-unexpandable-row__title, .kt-base-row__title";
pub const ROW_VALUE: &str = ".kt-unexpandable-row__value";
pub const HIDDEN_NOTICE_TITLE: &str = ".kt-unexpandable-row__title";
pub const SECTION: &str = "section.post-page__section--padded";
pub const SECTION_HEADING: &str = "h2.kt-title-row__title";
pub const DESCRIPTION: &str = "p.kt-description-row__text";
pub const BREADCRUMB_CATEGORY: &str =
    r#".kt-breadcrumbs__item a[href*="/buy-"], .kt-breadcrumbs__item a[href*="/rent-"]"#;
pub const CDN_IMAGE: &str = r#"img[src*="divarcdn.com"]"#;

pub const HIGH_RES_MARKER: &str = "webp_post";
pub const THUMBNAIL_MARKER: &str = "thumbnail";

// Labels
pub const TIME_LOCATION_SEPARATOR: &str = " در ";
pub const LABEL_AREA: &str = "متراژ";
pub const LABEL_BUILD_YEAR: &str = "ساخت";
pub const LABEL_ROOMS: &str = "اتاق";
pub const LABEL_ELEVATOR: &str = "آسانسور";
pub const LABEL_PARKING: &str = "پارکینگ";
pub const LABEL_WAREHOUSE: &str = "انباری";
pub const LABEL_DESCRIPTION: &str = "توضیحات";
pub const EMPTY_DESCRIPTION: &str = "موردی برای نمایش وجود ندارد";
pub const LABEL_TOTAL_PRICE: &str = "قیمت کل";
pub const LABEL_FLOOR: &str = "طبقه";
pub const LABEL_DEPOSIT: &str = "ودیعه";
pub const LABEL_RENT: &str = "اجاره";
pub const LABEL_MONTHLY: &str = "ماهانه";
pub const HIDDEN_PHONE_NOTICE: &str = "شماره مخفی شده است";

/// Words on a search card that mark a rent listing (deposit, rent, mortgage)
pub const RENT_KEYWORDS: [&str; 3] = ["ودیعه", "اجاره", "رهن"];

/// Parse a selector, turning a syntax error into an `anyhow` error.
pub fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector:?}: {e:?}"))
}
