use crate::blacklist::BlacklistStore;
use crate::error::KnownIdsError;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Why a card was left out of the candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Already stored by the collector
    Known,
    /// Rejected earlier and recorded in the local blacklist
    Blacklisted,
}

/// Ids to skip during one monitoring cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    known: HashSet<String>,
    blacklisted: HashSet<String>,
}

impl ExclusionSet {
    pub fn new(known: HashSet<String>, blacklisted: HashSet<String>) -> Self {
        Self { known, blacklisted }
    }

    /// Known ids are checked before blacklisted ones.
    pub fn check(&self, ad_id: &str) -> Option<Exclusion> {
        if self.known.contains(ad_id) {
            Some(Exclusion::Known)
        } else if self.blacklisted.contains(ad_id) {
            Some(Exclusion::Blacklisted)
        } else {
            None
        }
    }

    /// Record a rejection made during the current cycle.
    pub fn insert_blacklisted(&mut self, ad_id: impl Into<String>) {
        self.blacklisted.insert(ad_id.into());
    }

    /// Union of both sources.
    pub fn ids(&self) -> HashSet<String> {
        self.known.union(&self.blacklisted).cloned().collect()
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn blacklisted_len(&self) -> usize {
        self.blacklisted.len()
    }
}

/// Merges the remote known-ids list with the local blacklist.
#[derive(Debug, Clone)]
pub struct ExclusionSetBuilder {
    client: Client,
    known_ids_url: Option<String>,
    timeout: Duration,
    blacklist: BlacklistStore,
}

impl ExclusionSetBuilder {
    pub fn new(
        client: Client,
        known_ids_url: Option<String>,
        timeout: Duration,
        blacklist: BlacklistStore,
    ) -> Self {
        Self {
            client,
            known_ids_url,
            timeout,
            blacklist,
        }
    }

    /// Build the skip-set. Never fails: both sources degrade to empty.
    pub async fn build(&self) -> ExclusionSet {
        let known = match &self.known_ids_url {
            Some(url) => match self.fetch_known_ids(url).await {
                Ok(ids) => {
                    info!("✅ {} ad ids already known to the collector", ids.len());
                    ids
                }
                Err(e) => {
                    warn!(error = %e, "⚠️  Could not fetch known ad ids, continuing without them");
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        };

        let set = ExclusionSet::new(known, self.blacklist.ids_or_empty().await);
        info!(
            known = set.known_len(),
            blacklisted = set.blacklisted_len(),
            "🚫 Exclusion set ready"
        );
        set
    }

    async fn fetch_known_ids(&self, url: &str) -> Result<HashSet<String>, KnownIdsError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KnownIdsError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        parse_known_ids(body)
    }
}

/// Accept either `[ids...]` or `{"data": [ids...]}`; ids are coerced to
/// strings and falsy entries dropped.
pub fn parse_known_ids(body: Value) -> Result<HashSet<String>, KnownIdsError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(KnownIdsError::Malformed),
        },
        _ => return Err(KnownIdsError::Malformed),
    };

    Ok(items.into_iter().filter_map(coerce_id).collect())
}

fn coerce_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_shapes() {
        let bare = parse_known_ids(json!(["a", 12, "", null, 0, false])).unwrap();
        assert_eq!(bare, HashSet::from(["a".to_string(), "12".to_string()]));

        let wrapped = parse_known_ids(json!({"data": ["x", "y"]})).unwrap();
        assert_eq!(wrapped.len(), 2);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_known_ids(json!({"items": []})).is_err());
        assert!(parse_known_ids(json!("nope")).is_err());
        assert!(parse_known_ids(json!({"data": "x"})).is_err());
    }

    #[test]
    fn known_wins_over_blacklist() {
        let set = ExclusionSet::new(
            HashSet::from(["both".to_string(), "k".to_string()]),
            HashSet::from(["both".to_string(), "b".to_string()]),
        );
        assert_eq!(set.check("both"), Some(Exclusion::Known));
        assert_eq!(set.check("b"), Some(Exclusion::Blacklisted));
        assert_eq!(set.check("new"), None);
        assert_eq!(set.ids().len(), 3);
    }

    #[test]
    fn mid_cycle_rejection_is_excluded() {
        let mut set = ExclusionSet::default();
        set.insert_blacklisted("late");
        assert_eq!(set.check("late"), Some(Exclusion::Blacklisted));
    }
}
