//! # Command-Line Interface
//!
//! Grounded on `alaredis_server/main.go`'s `flag` block (`-b`, `-p`, `-log`,
//! `-thr`) — re-expressed with `clap`'s derive API, with `env` fallbacks
//! added since every other crate in this workspace follows the `clap`
//! `env` feature for container-friendly configuration.

use std::path::PathBuf;

use clap::Parser;

/// In-memory, type-aware key-value cache server.
#[derive(Debug, Parser)]
#[command(name = "alaredis-server", version, about)]
pub struct Cli {
    /// Number of shards (buckets) to partition keys across.
    #[arg(short = 'b', long = "buckets", env = "ALAREDIS_BUCKETS", default_value_t = 4)]
    pub buckets: usize,

    /// TCP port the HTTP front door listens on.
    #[arg(short = 'p', long = "port", env = "ALAREDIS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Write structured logs to this file instead of stderr.
    #[arg(long = "log", env = "ALAREDIS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Number of Tokio worker threads (0 = one per available core, matching
    /// the Go source's `-thr 0` meaning `runtime.NumCPU()`).
    #[arg(long = "threads", env = "ALAREDIS_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Periodically snapshot the store to disk under this directory.
    #[arg(long = "persist-dir", env = "ALAREDIS_PERSIST_DIR")]
    pub persist_dir: Option<PathBuf>,

    /// Interval in seconds between snapshots, when `--persist-dir` is set.
    #[arg(long = "persist-interval", env = "ALAREDIS_PERSIST_INTERVAL", default_value_t = 300)]
    pub persist_interval_secs: u64,

    /// Restore the store from a snapshot file written by an earlier run
    /// before serving any requests.
    #[arg(long = "restore", env = "ALAREDIS_RESTORE")]
    pub restore_from: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cli = Cli::parse_from(["alaredis-server"]);
        assert_eq!(cli.buckets, 4);
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.threads, 0);
        assert!(cli.log_file.is_none());
        assert!(cli.persist_dir.is_none());
        assert!(cli.restore_from.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "alaredis-server",
            "-b",
            "16",
            "-p",
            "9090",
            "--persist-dir",
            "/tmp/snap",
        ]);
        assert_eq!(cli.buckets, 16);
        assert_eq!(cli.port, 9090);
        assert_eq!(cli.persist_dir, Some(PathBuf::from("/tmp/snap")));
    }
}
