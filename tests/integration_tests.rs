use crawl_frontier::*;
use std::sync::Arc;
use tempfile::TempDir;

fn config(dir: &TempDir, resumable: bool) -> FrontierConfig {
    FrontierConfig {
        storage_folder: dir.path().to_path_buf(),
        resumable,
        ..FrontierConfig::default()
    }
}

fn record(priority: u8, depth: u32, docid: u32) -> UrlRecord {
    let url = format!("https://crawl.test/page/{}", docid);
    UrlRecord::new(url.clone(), url, docid)
        .with_priority(priority)
        .with_depth(depth)
}

#[test]
fn test_resumable_frontier_survives_restart_without_close() {
    let dir = TempDir::new().unwrap();
    {
        let store = CrawlStore::open(&config(&dir, true)).unwrap();
        let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
        frontier.enqueue(&record(0, 1, 3)).unwrap();
        frontier.enqueue(&record(0, 0, 4)).unwrap();
        frontier.delete_batch(1).unwrap();
        // Simulated crash: neither close nor flush.
    }

    let store = CrawlStore::open(&config(&dir, true)).unwrap();
    let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
    let remaining = frontier.peek_batch(10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].docid, 3);
}

#[test]
fn test_volatile_frontier_survives_graceful_close() {
    let dir = TempDir::new().unwrap();
    {
        let store = CrawlStore::open(&config(&dir, false)).unwrap();
        let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
        assert_eq!(frontier.mode(), DurabilityMode::Volatile);
        for docid in 1..=10 {
            frontier.enqueue(&record(0, 0, docid)).unwrap();
        }
        frontier.close();
    }

    let store = CrawlStore::open(&config(&dir, false)).unwrap();
    let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
    assert_eq!(frontier.length(), 10);
}

#[test]
fn test_fresh_open_discards_previous_crawl() {
    let dir = TempDir::new().unwrap();
    {
        let store = CrawlStore::open(&config(&dir, false)).unwrap();
        let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
        frontier.enqueue(&record(0, 0, 1)).unwrap();
        frontier.close();
    }

    let store = CrawlStore::open_fresh(&config(&dir, false)).unwrap();
    let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
    assert!(frontier.is_empty());
}

#[test]
fn test_two_regions_share_one_file() {
    let dir = TempDir::new().unwrap();
    let store = CrawlStore::open(&config(&dir, true)).unwrap();
    let pending = store.open_frontier(Config::PENDING_REGION).unwrap();
    let in_process = store.open_frontier(Config::IN_PROCESS_REGION).unwrap();

    pending.enqueue(&record(0, 0, 1)).unwrap();
    pending.enqueue(&record(0, 0, 2)).unwrap();

    // Move the head of the pending queue into the in-process region.
    let batch = pending.peek_batch(1).unwrap();
    in_process.enqueue_all(&batch).unwrap();
    pending.retire(&batch).unwrap();

    assert_eq!(pending.length(), 1);
    assert_eq!(in_process.length(), 1);
    assert_eq!(in_process.peek_batch(1).unwrap()[0].docid, 1);
}

#[test]
fn test_crawl_loop_with_scheduler() {
    let dir = TempDir::new().unwrap();
    let store = CrawlStore::open(&config(&dir, true)).unwrap();
    let frontier = store.open_frontier(Config::PENDING_REGION).unwrap();
    let registry = InMemoryDocIds::new();

    let seeds = vec!["https://crawl.test/".to_string()];
    schedule_seeds(&frontier, &registry, &seeds, 0).unwrap();

    let pages: &[(&str, &[&str])] = &[
        ("https://crawl.test/", &["/a", "/b", "./a?PHPSESSID=1"]),
        ("https://crawl.test/a", &["b", "/c"]),
        ("https://crawl.test/b", &["/"]),
        ("https://crawl.test/c", &[]),
    ];

    let mut visited = Vec::new();
    loop {
        let batch = frontier.peek_batch(1).unwrap();
        let Some(page) = batch.first() else { break };
        visited.push(page.canonical_url.clone());

        let links: Vec<DiscoveredLink> = pages
            .iter()
            .find(|(url, _)| *url == page.canonical_url)
            .map(|(_, links)| links.iter().map(|l| DiscoveredLink::new(*l)).collect())
            .unwrap_or_default();
        schedule_links(&frontier, &registry, page, &links, Some(2)).unwrap();
        frontier.retire(&batch).unwrap();
    }

    assert_eq!(
        visited,
        vec![
            "https://crawl.test/",
            "https://crawl.test/a",
            "https://crawl.test/b",
            "https://crawl.test/c",
        ]
    );
    assert_eq!(registry.len(), 4);
    assert!(frontier.is_empty());
}

#[test]
fn test_concurrent_enqueue_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let store = CrawlStore::open(&config(&dir, true)).unwrap();
    let frontier = Arc::new(store.open_frontier(Config::PENDING_REGION).unwrap());
    let registry = Arc::new(InMemoryDocIds::new());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let frontier = Arc::clone(&frontier);
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..20 {
                    let url = format!("https://w{}.crawl.test/{}", worker, i);
                    let canonical = canonicalize_url(&url).unwrap();
                    let docid = registry.assign(&canonical).unwrap().docid();
                    frontier
                        .enqueue(&UrlRecord::new(url, canonical, docid).with_priority(worker % 3))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(frontier.length(), 160);

    let all = frontier.peek_batch(1000).unwrap();
    assert_eq!(all.len(), 160);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].key().as_bytes() < pair[1].key().as_bytes()));
}

#[test]
fn test_canonicalizer_example_end_to_end() {
    assert_eq!(
        canonicalize_url("http://EXAMPLE.com:80/a/./b/../c?b=2&a=1&PHPSESSID=xyz").as_deref(),
        Some("http://example.com/a/c?a=1&b=2")
    );
    assert_eq!(canonicalize("../x", Some("not a url")), None);
}
