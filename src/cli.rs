use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "armada",
    version,
    about = "A terminal cockpit for aggregated multi-cluster workload health."
)]
pub struct CliArgs {
    /// Aggregation endpoint serving the workload snapshot
    #[arg(long, default_value = "http://127.0.0.1:3000/api/workloads")]
    pub endpoint: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1_000)]
    pub poll_ms: u64,

    /// Snapshot request timeout in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub timeout_ms: u64,

    /// Start restricted to one cluster key ("*" for all)
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Start with the failed-only filter enabled
    #[arg(long)]
    pub failed_only: bool,

    /// Skip restoring the saved search/failed-only filters
    #[arg(long)]
    pub no_restore: bool,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
