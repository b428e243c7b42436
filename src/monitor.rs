use crate::blacklist::BlacklistStore;
use crate::config::Config;
use crate::cookies::CookieJar;
use crate::exclusion::{ExclusionSet, ExclusionSetBuilder};
use crate::models::{AdKind, Candidate};
use crate::pacing::random_minutes;
use crate::scrapers::discovery::discover;
use crate::scrapers::extractor::AdExtractor;
use crate::scrapers::traits::{RenderSession, RenderedPage};
use crate::sender::AdSink;
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

/// Running totals across all cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total_checks: u64,
    pub ads_found: u64,
    pub ads_processed: u64,
    pub sale_ads: u64,
    pub rent_ads: u64,
    pub sent: u64,
    pub errors: u64,
    pub skipped_known: u64,
    pub skipped_blacklisted: u64,
    pub blacklisted: u64,
}

impl Statistics {
    pub fn log_summary(&self) {
        info!(
            checks = self.total_checks,
            found = self.ads_found,
            processed = self.ads_processed,
            sale = self.sale_ads,
            rent = self.rent_ads,
            sent = self.sent,
            blacklisted = self.blacklisted,
            skipped_known = self.skipped_known,
            skipped_blacklisted = self.skipped_blacklisted,
            errors = self.errors,
            "📊 Monitor statistics"
        );
    }
}

/// Counters for a single cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub found: usize,
    pub processed: usize,
    pub sent: usize,
    pub blacklisted: usize,
    pub errors: usize,
    pub interrupted: bool,
}

/// Drives discovery, extraction and submission on a fixed cadence.
///
/// Cycles never overlap: the next one is scheduled only after the current
/// one returns, and candidates are processed one at a time.
pub struct Monitor {
    config: Config,
    session: Arc<dyn RenderSession>,
    main_page: Box<dyn RenderedPage>,
    exclusion: ExclusionSetBuilder,
    extractor: AdExtractor,
    sink: Arc<dyn AdSink>,
    cookies: CookieJar,
    stats: Statistics,
}

impl Monitor {
    /// Open the main page and restore a saved session if there is one.
    pub async fn initialize(
        config: Config,
        session: Arc<dyn RenderSession>,
        sink: Arc<dyn AdSink>,
        client: Client,
    ) -> Result<Self> {
        let blacklist = BlacklistStore::new(&config.blacklist_path);
        if let Err(e) = blacklist.ensure_exists().await {
            warn!(error = %e, "Could not create blacklist file");
        }

        let main_page = session
            .open_page()
            .await
            .context("Failed to open the main page")?;

        let cookies = CookieJar::new(&config.cookies_path);
        let stored = cookies.load().await;
        if !stored.is_empty() {
            match session.apply_cookies(&stored).await {
                Ok(_) => {
                    if let Err(e) = session.verify_login().await {
                        warn!(error = %e, "Login check failed");
                    }
                }
                Err(e) => warn!(error = %e, "Could not restore saved session"),
            }
        }

        let exclusion = ExclusionSetBuilder::new(
            client,
            config.remote.known_ids_url.clone(),
            config.remote.known_ids_timeout,
            blacklist.clone(),
        );
        let extractor = AdExtractor::new(Arc::clone(&session), blacklist, config.extractor);

        Ok(Self {
            config,
            session,
            main_page,
            exclusion,
            extractor,
            sink,
            cookies,
            stats: Statistics::default(),
        })
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Run cycles until `shutdown` flips to `true`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.monitor.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "👀 Monitoring {} every {:?}",
            self.config.discovery.listing_url, self.config.monitor.check_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            let report = self.run_cycle(&mut shutdown).await;
            self.stats.log_summary();

            if report.interrupted || *shutdown.borrow() {
                break;
            }
        }

        info!("Monitor loop stopped");
    }

    /// One discovery + extraction + submission pass.
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> CycleReport {
        self.stats.total_checks += 1;
        let mut report = CycleReport::default();

        let mut exclusion = self.exclusion.build().await;

        let outcome = match discover(self.main_page.as_ref(), &self.config.discovery, &exclusion).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.errors += 1;
                report.errors += 1;
                error!(error = %format!("{e:#}"), "❌ Listing discovery failed");
                return report;
            }
        };

        report.found = outcome.unique_cards;
        self.stats.ads_found += outcome.unique_cards as u64;
        self.stats.skipped_known += outcome.skipped_known as u64;
        self.stats.skipped_blacklisted += outcome.skipped_blacklisted as u64;

        if outcome.candidates.is_empty() {
            info!("ℹ️  No new ads found");
            return report;
        }

        let total = outcome.candidates.len();
        for (index, candidate) in outcome.candidates.iter().enumerate() {
            if *shutdown.borrow() {
                info!("Shutdown requested, leaving the remaining ads for later");
                report.interrupted = true;
                break;
            }

            self.process_candidate(candidate, &mut exclusion, &mut report).await;

            if index + 1 < total && self.pause(shutdown).await {
                report.interrupted = true;
                break;
            }
        }

        report
    }

    async fn process_candidate(
        &mut self,
        candidate: &Candidate,
        exclusion: &mut ExclusionSet,
        report: &mut CycleReport,
    ) {
        report.processed += 1;
        self.stats.ads_processed += 1;
        match candidate.kind {
            AdKind::Sale => self.stats.sale_ads += 1,
            AdKind::Rent => self.stats.rent_ads += 1,
        }

        let ad = match self.extractor.extract(&candidate.url, candidate.kind).await {
            Ok(Some(ad)) => ad,
            Ok(None) => {
                exclusion.insert_blacklisted(candidate.ad_id.clone());
                report.blacklisted += 1;
                self.stats.blacklisted += 1;
                return;
            }
            Err(e) => {
                report.errors += 1;
                self.stats.errors += 1;
                error!(ad_id = %candidate.ad_id, error = %e, "❌ Failed to process ad");
                return;
            }
        };

        match self.sink.submit(&ad).await {
            Ok(()) => {
                report.sent += 1;
                self.stats.sent += 1;
                info!(ad_id = %candidate.ad_id, kind = %candidate.kind, "🚀 Ad sent");
            }
            Err(e) => {
                report.errors += 1;
                self.stats.errors += 1;
                error!(ad_id = %candidate.ad_id, error = %e, "❌ Failed to send ad");
            }
        }
    }

    /// Sleep the randomized inter-candidate delay. Returns `true` when a
    /// shutdown arrived first.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let (min, max) = self.config.monitor.delay_minutes;
        let delay = random_minutes(min, max);
        if delay.is_zero() {
            return *shutdown.borrow();
        }

        info!("⏳ Waiting {} minutes before the next ad...", delay.as_secs() / 60);
        tokio::select! {
            _ = sleep(delay) => false,
            _ = shutdown_requested(shutdown) => true,
        }
    }

    /// Persist cookies if configured and close the rendering session.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down...");

        if self.config.save_cookies_on_exit {
            match self.session.export_cookies().await {
                Ok(cookies) if !cookies.is_empty() => {
                    if let Err(e) = self.cookies.save(&cookies).await {
                        warn!(error = %e, "Could not save cookies");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Could not read session cookies"),
            }
        }

        if let Err(e) = self.main_page.close().await {
            warn!(error = %e, "Failed to close main page");
        }
        self.session.close().await
    }
}

/// Resolves once the flag is set. A dropped sender counts as a request.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
