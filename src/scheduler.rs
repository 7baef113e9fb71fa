//! Turns discovered links into frontier records.

use tracing::{debug, warn};

use crate::docid::{DocIdAssignment, DocIdRegistry};
use crate::frontier::Frontier;
use crate::models::UrlRecord;
use crate::store::StoreError;
use crate::url_utils;

/// A link as the extractor found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub href: String,
    pub anchor: Option<String>,
}

impl DiscoveredLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }
}

/// What happened to each link handed to the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub scheduled: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub too_deep: usize,
    /// Links dropped because the registry ran out of docids.
    pub unassigned: usize,
}

impl ScheduleReport {
    pub fn total(&self) -> usize {
        self.scheduled + self.duplicates + self.malformed + self.too_deep + self.unassigned
    }
}

impl std::fmt::Display for ScheduleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scheduled={} duplicates={} malformed={} too_deep={} unassigned={}",
            self.scheduled, self.duplicates, self.malformed, self.too_deep, self.unassigned
        )
    }
}

/// Canonicalize, dedup and enqueue the links found on `parent`.
///
/// Children sit one hop deeper than the parent and inherit its priority.
/// All new records are written in one transaction.
pub fn schedule_links(
    frontier: &Frontier,
    registry: &dyn DocIdRegistry,
    parent: &UrlRecord,
    links: &[DiscoveredLink],
    max_depth: Option<u32>,
) -> Result<ScheduleReport, StoreError> {
    let mut report = ScheduleReport::default();
    let depth = parent.depth.saturating_add(1);

    if max_depth.is_some_and(|max| depth > max) {
        report.too_deep = links.len();
        debug!(parent = %parent.canonical_url, depth, "Links past depth limit");
        return Ok(report);
    }

    let mut records = Vec::with_capacity(links.len());
    for link in links {
        let canonical = match url_utils::canonicalize(&link.href, Some(&parent.canonical_url)) {
            Some(canonical) => canonical,
            None => {
                report.malformed += 1;
                continue;
            }
        };

        let docid = match registry.assign(&canonical) {
            Some(DocIdAssignment::New(docid)) => docid,
            Some(DocIdAssignment::Seen(_)) => {
                report.duplicates += 1;
                continue;
            }
            None => {
                report.unassigned += 1;
                continue;
            }
        };

        let mut record = UrlRecord::new(link.href.clone(), canonical, docid)
            .with_priority(parent.priority)
            .with_depth(depth)
            .with_parent(parent.docid, parent.url.clone());
        if let Some(anchor) = &link.anchor {
            record = record.with_anchor(anchor.clone());
        }
        records.push(record);
    }

    enqueue_or_release(frontier, registry, &records)?;
    report.scheduled = records.len();

    if report.unassigned > 0 {
        warn!(dropped = report.unassigned, "Docid space exhausted");
    }
    debug!(
        parent = %parent.canonical_url,
        scheduled = report.scheduled,
        duplicates = report.duplicates,
        malformed = report.malformed,
        "Scheduled links"
    );

    Ok(report)
}

/// Enqueue absolute seed URLs at depth 0.
pub fn schedule_seeds(
    frontier: &Frontier,
    registry: &dyn DocIdRegistry,
    seeds: &[String],
    priority: u8,
) -> Result<ScheduleReport, StoreError> {
    let mut report = ScheduleReport::default();
    let mut records = Vec::with_capacity(seeds.len());

    for seed in seeds {
        let Some(canonical) = url_utils::canonicalize_url(seed) else {
            warn!(seed = %seed, "Skipping malformed seed");
            report.malformed += 1;
            continue;
        };

        match registry.assign(&canonical) {
            Some(DocIdAssignment::New(docid)) => {
                records.push(UrlRecord::new(seed.clone(), canonical, docid).with_priority(priority));
            }
            Some(DocIdAssignment::Seen(_)) => report.duplicates += 1,
            None => report.unassigned += 1,
        }
    }

    enqueue_or_release(frontier, registry, &records)?;
    report.scheduled = records.len();
    Ok(report)
}

/// Enqueue `records`; on failure hand their docids back so a retry sees the
/// links as new.
fn enqueue_or_release(
    frontier: &Frontier,
    registry: &dyn DocIdRegistry,
    records: &[UrlRecord],
) -> Result<(), StoreError> {
    if let Err(e) = frontier.enqueue_all(records) {
        for record in records {
            registry.release(&record.canonical_url);
        }
        warn!(released = records.len(), error = %e, "Enqueue failed, released docids");
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrontierConfig;
    use crate::docid::InMemoryDocIds;
    use crate::store::{CrawlStore, FailingStore};
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> (CrawlStore, Frontier) {
        let config = FrontierConfig {
            storage_folder: dir.path().to_path_buf(),
            ..FrontierConfig::default()
        };
        let store = CrawlStore::open(&config).unwrap();
        let frontier = store.open_frontier("PendingURLsDB").unwrap();
        (store, frontier)
    }

    #[test]
    fn test_schedule_links_counts_outcomes() {
        let dir = TempDir::new().unwrap();
        let (_store, frontier) = open(&dir);
        let registry = InMemoryDocIds::new();

        let seeds = vec!["https://test.local/".to_string()];
        schedule_seeds(&frontier, &registry, &seeds, 2).unwrap();
        let parent = frontier.peek_batch(1).unwrap().remove(0);

        let links = vec![
            DiscoveredLink::new("/a").with_anchor("A"),
            DiscoveredLink::new("a#frag"),
            DiscoveredLink::new("https://TEST.local:443/b"),
            DiscoveredLink::new("http://%zz/"),
            DiscoveredLink::new("/"),
        ];
        let report = schedule_links(&frontier, &registry, &parent, &links, None).unwrap();

        assert_eq!(report.scheduled, 2);
        assert_eq!(report.duplicates, 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.total(), links.len());

        let queued = frontier.peek_batch(10).unwrap();
        assert_eq!(queued.len(), 3);
        let child = &queued[1];
        assert_eq!(child.canonical_url, "https://test.local/a");
        assert_eq!(child.depth, 1);
        assert_eq!(child.priority, 2);
        assert_eq!(child.parent_docid, Some(parent.docid));
        assert_eq!(child.anchor.as_deref(), Some("A"));
    }

    #[test]
    fn test_schedule_links_respects_max_depth() {
        let dir = TempDir::new().unwrap();
        let (_store, frontier) = open(&dir);
        let registry = InMemoryDocIds::new();

        let parent = UrlRecord::new("https://test.local/", "https://test.local/", 1).with_depth(3);
        let links = vec![DiscoveredLink::new("/x"), DiscoveredLink::new("/y")];

        let report = schedule_links(&frontier, &registry, &parent, &links, Some(3)).unwrap();
        assert_eq!(report.too_deep, 2);
        assert!(frontier.is_empty());

        let report = schedule_links(&frontier, &registry, &parent, &links, Some(4)).unwrap();
        assert_eq!(report.scheduled, 2);
        assert_eq!(frontier.length(), 2);
    }

    #[test]
    fn test_schedule_seeds_skips_relative() {
        let dir = TempDir::new().unwrap();
        let (_store, frontier) = open(&dir);
        let registry = InMemoryDocIds::new();

        let seeds = vec![
            "https://a.test/".to_string(),
            "/relative".to_string(),
            "https://A.test:443/".to_string(),
        ];
        let report = schedule_seeds(&frontier, &registry, &seeds, 0).unwrap();
        assert_eq!(report.scheduled, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_exhausted_registry_drops_links() {
        let dir = TempDir::new().unwrap();
        let (_store, frontier) = open(&dir);
        let registry = InMemoryDocIds::starting_at(u32::MAX);

        let parent = UrlRecord::new("https://test.local/", "https://test.local/", 1);
        let links = vec![DiscoveredLink::new("/1"), DiscoveredLink::new("/2")];

        let report = schedule_links(&frontier, &registry, &parent, &links, None).unwrap();
        assert_eq!(report.scheduled, 1);
        assert_eq!(report.unassigned, 1);
    }

    #[test]
    fn test_failed_enqueue_releases_docids_for_retry() {
        let registry = InMemoryDocIds::new();
        let parent = UrlRecord::new("https://test.local/", "https://test.local/", 1);
        let links = vec![DiscoveredLink::new("/x"), DiscoveredLink::new("/y")];

        let broken = Frontier::new(Box::new(FailingStore));
        assert!(schedule_links(&broken, &registry, &parent, &links, None).is_err());
        assert!(registry.is_empty());

        let seeds = vec!["https://test.local/seed".to_string()];
        assert!(schedule_seeds(&broken, &registry, &seeds, 0).is_err());
        assert!(registry.is_empty());

        let dir = TempDir::new().unwrap();
        let (_store, frontier) = open(&dir);
        let report = schedule_links(&frontier, &registry, &parent, &links, None).unwrap();
        assert_eq!(report.scheduled, 2);
        assert_eq!(report.duplicates, 0);
        assert_eq!(frontier.length(), 2);
    }
}
