use crate::error::Result;
use crate::ingestion::SourceExtract;
use crate::schema::{PeriodSelection, ReportConfig};
use crate::{Report, ReportProcessor};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// SHA-256 of an extract's JSON form. Equal extracts give equal fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractFingerprint(String);

impl ExtractFingerprint {
    pub fn of(extract: &SourceExtract) -> Result<Self> {
        let bytes = serde_json::to_vec(extract)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtractFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Memoizes reports per period selection for the current source extract.
/// Handing in a different extract drops everything cached for the old one.
pub struct ReportCache {
    config: ReportConfig,
    fingerprint: Option<ExtractFingerprint>,
    reports: HashMap<PeriodSelection, Report>,
    hits: u64,
    misses: u64,
}

impl ReportCache {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            fingerprint: None,
            reports: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_compute(
        &mut self,
        extract: &SourceExtract,
        selection: &PeriodSelection,
    ) -> Result<&Report> {
        let fingerprint = ExtractFingerprint::of(extract)?;

        if self.fingerprint.as_ref() != Some(&fingerprint) {
            if !self.reports.is_empty() {
                info!(
                    "Source extract changed ({}); dropping {} cached reports",
                    fingerprint,
                    self.reports.len()
                );
            }
            self.reports.clear();
            self.fingerprint = Some(fingerprint);
        }

        match self.reports.entry(selection.clone()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                debug!("Report cache hit for {}", selection);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let report = ReportProcessor::process(extract, selection, &self.config)?;
                Ok(entry.insert(report))
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.reports.clear();
        self.fingerprint = None;
    }

    pub fn fingerprint(&self) -> Option<&ExtractFingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::CashRow;

    fn extract(inflow: &str) -> SourceExtract {
        SourceExtract {
            cash_rows: vec![CashRow {
                date: "2025-01-10".to_string(),
                inflow: inflow.to_string(),
                outflow: String::new(),
            }],
            ..SourceExtract::default()
        }
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = ExtractFingerprint::of(&extract("100")).unwrap();
        let b = ExtractFingerprint::of(&extract("100")).unwrap();
        let c = ExtractFingerprint::of(&extract("101")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_repeated_selection_hits_cache() {
        let mut cache = ReportCache::new(ReportConfig::default());
        let source = extract("100");
        let january = PeriodSelection::parse("2025-01").unwrap();

        let first = cache.get_or_compute(&source, &january).unwrap().clone();
        let second = cache.get_or_compute(&source, &january).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_changed_extract_invalidates() {
        let mut cache = ReportCache::new(ReportConfig::default());
        let january = PeriodSelection::parse("2025-01").unwrap();
        let quarter = PeriodSelection::parse("2025-Q1").unwrap();

        cache.get_or_compute(&extract("100"), &january).unwrap();
        cache.get_or_compute(&extract("100"), &quarter).unwrap();
        assert_eq!(cache.len(), 2);

        let report = cache.get_or_compute(&extract("250"), &january).unwrap();
        assert_eq!(report.cash_summary.total_inflow, 250.0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 3);

        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.fingerprint().is_none());
    }
}
