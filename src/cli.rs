use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Operator CLI for inspecting and feeding a crawl frontier.
/// Exit codes: 0=success, 1=store or config error, 2=invalid arguments or URL
#[derive(Parser, Debug)]
#[command(name = "crawl-frontier")]
#[command(about = "Durable crawl frontier and URL canonicalizer")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "JSON frontier config file; flags below override it")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Directory holding the frontier database")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Queue region (table) to operate on")]
    pub region: Option<String>,

    #[arg(long, global = true, help = "Use non-durable commits, flushed on exit")]
    pub volatile: bool,

    #[arg(long, global = true, help = "Discard existing frontier state before running")]
    pub fresh: bool,

    #[arg(long, global = true, help = "Write rotated log files to this directory")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the canonical form of a URL.
    Canonicalize {
        #[arg(help = "Absolute URL, or a reference relative to --base")]
        reference: String,

        #[arg(short, long, help = "Base URL to resolve the reference against")]
        base: Option<String>,
    },

    /// Canonicalize a URL and add it to the frontier.
    Enqueue {
        #[arg(short, long, help = "URL to enqueue")]
        url: String,

        #[arg(long, help = "Docid assigned to this URL")]
        docid: u32,

        #[arg(short, long, default_value = "0", help = "Priority, 0 is crawled first")]
        priority: u8,

        #[arg(long, default_value = "0", help = "Link hops from a seed")]
        depth: u32,

        #[arg(long, help = "Docid of the page the URL was found on")]
        parent_docid: Option<u32>,

        #[arg(short, long, help = "Base URL for resolving a relative --url")]
        base: Option<String>,
    },

    /// Schedule links found on a page, honoring the configured depth limit.
    Schedule {
        #[arg(long, help = "URL of the page the links were found on")]
        parent: String,

        #[arg(long, help = "Docid of the parent page")]
        parent_docid: u32,

        #[arg(long, default_value = "0", help = "Depth of the parent page")]
        parent_depth: u32,

        #[arg(short, long, default_value = "0", help = "Priority inherited by the links")]
        priority: u8,

        #[arg(long, help = "First docid to hand out to new links")]
        first_docid: u32,

        #[arg(required = true, help = "Links as found on the page, absolute or relative")]
        links: Vec<String>,
    },

    /// Print the front of the queue as JSON lines without removing it.
    Peek {
        #[arg(short, long, help = "Maximum records to print [default: config batch size]")]
        max: Option<usize>,
    },

    /// Remove records from the front of the queue.
    Delete {
        #[arg(short = 'n', long, help = "Number of records to remove [default: config batch size]")]
        count: Option<usize>,
    },

    /// Print the number of queued entries.
    Len,

    /// Print a one-line summary of the frontier.
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_command() {
        let cli = Cli::try_parse_from([
            "crawl-frontier",
            "canonicalize",
            "../b",
            "--base",
            "http://test.local/a/c",
        ])
        .unwrap();

        match cli.command {
            Commands::Canonicalize { reference, base } => {
                assert_eq!(reference, "../b");
                assert_eq!(base.as_deref(), Some("http://test.local/a/c"));
            }
            _ => panic!("Expected Canonicalize command"),
        }
    }

    #[test]
    fn test_enqueue_defaults() {
        let cli = Cli::try_parse_from([
            "crawl-frontier",
            "enqueue",
            "--url",
            "https://test.local/",
            "--docid",
            "9",
        ])
        .unwrap();

        match cli.command {
            Commands::Enqueue {
                url,
                docid,
                priority,
                depth,
                parent_docid,
                base,
            } => {
                assert_eq!(url, "https://test.local/");
                assert_eq!(docid, 9);
                assert_eq!(priority, 0);
                assert_eq!(depth, 0);
                assert_eq!(parent_docid, None);
                assert_eq!(base, None);
            }
            _ => panic!("Expected Enqueue command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "crawl-frontier",
            "peek",
            "--max",
            "5",
            "--data-dir",
            "/tmp/frontier",
            "--volatile",
            "-r",
            "InProcessPagesDB",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/frontier")));
        assert!(cli.volatile);
        assert!(!cli.fresh);
        assert_eq!(cli.region.as_deref(), Some("InProcessPagesDB"));
        assert!(matches!(cli.command, Commands::Peek { max: Some(5) }));
    }

    #[test]
    fn test_schedule_command() {
        let cli = Cli::try_parse_from([
            "crawl-frontier",
            "schedule",
            "--parent",
            "https://test.local/",
            "--parent-docid",
            "1",
            "--first-docid",
            "10",
            "/a",
            "b",
        ])
        .unwrap();

        match cli.command {
            Commands::Schedule {
                parent,
                parent_docid,
                parent_depth,
                first_docid,
                links,
                ..
            } => {
                assert_eq!(parent, "https://test.local/");
                assert_eq!(parent_docid, 1);
                assert_eq!(parent_depth, 0);
                assert_eq!(first_docid, 10);
                assert_eq!(links, vec!["/a", "b"]);
            }
            _ => panic!("Expected Schedule command"),
        }

        let missing_links = Cli::try_parse_from([
            "crawl-frontier",
            "schedule",
            "--parent",
            "https://test.local/",
            "--parent-docid",
            "1",
            "--first-docid",
            "10",
        ]);
        assert!(missing_links.is_err());
    }

    #[test]
    fn test_delete_short_flag() {
        let cli = Cli::try_parse_from(["crawl-frontier", "delete", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { count: Some(3) }));
    }

    #[test]
    fn test_enqueue_requires_docid() {
        let cli = Cli::try_parse_from(["crawl-frontier", "enqueue", "--url", "https://x.test/"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_help_does_not_panic() {
        let cli = Cli::try_parse_from(["crawl-frontier", "--help"]);
        assert!(cli.is_err());
        let err = cli.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_panic() {
        let cli = Cli::try_parse_from(["crawl-frontier", "--version"]);
        assert!(cli.is_err());
        let err = cli.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
