use crate::exclusion::{Exclusion, ExclusionSet};
use crate::models::{ad_id_from_url, AdKind, Candidate};
use crate::pacing::random_millis;
use crate::scrapers::selectors;
use crate::scrapers::traits::RenderedPage;
use anyhow::{Context, Result};
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Where and how to scan the search results
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub listing_url: String,
    /// Prefix for relative card links
    pub site_origin: String,
    pub card_wait: Duration,
    /// Pause before reloading when the first wait for cards fails
    pub reload_delay: Duration,
    pub scroll_steps: u32,
    /// Inclusive millisecond range for the pause after each scroll step
    pub scroll_delay_ms: (u64, u64),
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://divar.ir/s/nurabad/real-estate".to_string(),
            site_origin: "https://divar.ir".to_string(),
            card_wait: Duration::from_secs(10),
            reload_delay: Duration::from_secs(3),
            scroll_steps: 3,
            scroll_delay_ms: (1500, 3500),
        }
    }
}

/// Result of one scan of the listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub candidates: Vec<Candidate>,
    /// Card elements on the page, duplicates included
    pub raw_cards: usize,
    /// Distinct ad ids seen
    pub unique_cards: usize,
    pub skipped_known: usize,
    pub skipped_blacklisted: usize,
}

/// Load the listing page, scroll it and collect new candidates.
pub async fn discover(
    page: &dyn RenderedPage,
    config: &DiscoveryConfig,
    exclusion: &ExclusionSet,
) -> Result<DiscoveryOutcome> {
    info!("Opening listing page {}", config.listing_url);
    page.navigate(&config.listing_url)
        .await
        .context("Failed to open listing page")?;

    if let Err(e) = page.wait_for(selectors::CARD_LINK, config.card_wait).await {
        warn!(error = %e, "⚠️  No ad cards yet, reloading once...");
        sleep(config.reload_delay).await;
        page.reload().await.context("Failed to reload listing page")?;
        page.wait_for(selectors::CARD_LINK, config.card_wait)
            .await
            .context("No ad cards on listing page after reload")?;
    }

    for step in 0..config.scroll_steps {
        page.scroll_step()
            .await
            .with_context(|| format!("Scroll step {} failed", step + 1))?;
        let (min, max) = config.scroll_delay_ms;
        sleep(random_millis(min, max)).await;
    }

    let html = page
        .content()
        .await
        .context("Failed to read listing page")?;

    let outcome = parse_cards(&html, &config.site_origin, exclusion)?;

    info!("📄 Cards seen: {}", outcome.raw_cards);
    info!("⏭️  Skipped (already known): {}", outcome.skipped_known);
    info!("🚫 Skipped (blacklisted): {}", outcome.skipped_blacklisted);
    info!("✅ Ads ready for processing: {}", outcome.candidates.len());

    Ok(outcome)
}

/// Turn the cards of a listing page into classified candidates.
///
/// Each card's own text decides its kind, so keywords never leak between
/// neighbouring cards.
pub fn parse_cards(html: &str, site_origin: &str, exclusion: &ExclusionSet) -> Result<DiscoveryOutcome> {
    let document = Html::parse_document(html);
    let card_selector = selectors::parse(selectors::CARD)?;
    let link_selector = selectors::parse(selectors::CARD_ACTION)?;

    let mut outcome = DiscoveryOutcome::default();
    let mut seen = HashSet::new();

    for card in document.select(&card_selector) {
        let Some(link) = card.select(&link_selector).next() else {
            continue;
        };
        outcome.raw_cards += 1;

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(ad_id) = ad_id_from_url(href) else {
            debug!(href, "Card link without an ad id");
            continue;
        };

        if !seen.insert(ad_id.clone()) {
            continue;
        }
        outcome.unique_cards += 1;

        match exclusion.check(&ad_id) {
            Some(Exclusion::Known) => {
                outcome.skipped_known += 1;
                continue;
            }
            Some(Exclusion::Blacklisted) => {
                outcome.skipped_blacklisted += 1;
                continue;
            }
            None => {}
        }

        let text = card.text().collect::<String>();
        let kind = if selectors::RENT_KEYWORDS.iter().any(|k| text.contains(k)) {
            AdKind::Rent
        } else {
            AdKind::Sale
        };

        outcome.candidates.push(Candidate {
            url: absolute_url(site_origin, href),
            ad_id,
            kind,
        });
    }

    Ok(outcome)
}

fn absolute_url(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}
