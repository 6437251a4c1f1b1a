//! Process configuration, grounded on the teacher's `agent::main::Args`
//! (`clap::Parser` deriving both a CLI flag and an env var per field).
//! Every flag here doubles as a `CLIPFEED_*` environment variable so the
//! server runs unconfigured-by-default in a container.

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub config: Config,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// `serve` runs the HTTP server (the default when no subcommand is given);
/// `sweep` runs one storage-sweep pass and exits, for an external cron
/// trigger rather than an in-process loop (§4.11).
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    Serve,
    Sweep,
}

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// Database URL (sqlite:// or postgres://).
    #[clap(long = "database-url", env = "CLIPFEED_DATABASE_URL", default_value = "sqlite://clipfeed.db")]
    pub database_url: String,

    /// Port the HTTP server listens on.
    #[clap(long = "port", env = "CLIPFEED_PORT", default_value = "8080")]
    pub port: u16,

    /// Secret used to sign bearer tokens. Must be set in any real deployment.
    #[clap(long = "token-secret", env = "CLIPFEED_TOKEN_SECRET", default_value = "development-only-insecure-secret")]
    pub token_secret: String,

    /// Secret used to derive the platform-cookie vault's AES-256 key.
    #[clap(long = "credential-secret", env = "CLIPFEED_CREDENTIAL_SECRET", default_value = "development-only-insecure-secret")]
    pub credential_secret: String,

    /// Shared secret the background worker presents to the internal API.
    #[clap(long = "worker-secret", env = "CLIPFEED_WORKER_SECRET", default_value = "development-only-insecure-secret")]
    pub worker_secret: String,

    /// Directory clip bytes are read from and deleted from.
    #[clap(long = "storage-dir", env = "CLIPFEED_STORAGE_DIR", default_value = "./storage")]
    pub storage_dir: String,

    /// Base URL presigned clip-stream links are minted under.
    #[clap(long = "public-base-url", env = "CLIPFEED_PUBLIC_BASE_URL", default_value = "http://localhost:8080/storage")]
    pub public_base_url: String,

    /// Soft cap on total clip storage, in bytes, before the sweeper evicts
    /// unprotected clips (§4.11).
    #[clap(long = "storage-limit-bytes", env = "CLIPFEED_STORAGE_LIMIT_BYTES", default_value = "53687091200")]
    pub storage_limit_bytes: i64,

    /// Origins allowed by CORS. May be specified multiple times.
    #[clap(long = "allow-origin", env = "CLIPFEED_ALLOW_ORIGIN", value_delimiter = ',')]
    pub allow_origin: Vec<String>,

    /// Requests allowed per IP per rate-limit window (§4.3).
    #[clap(long = "rate-limit", env = "CLIPFEED_RATE_LIMIT", default_value = "120")]
    pub rate_limit: i64,

    /// Rate-limit window, in seconds (§4.3).
    #[clap(long = "rate-limit-window-secs", env = "CLIPFEED_RATE_LIMIT_WINDOW_SECS", default_value = "60")]
    pub rate_limit_window_secs: u64,

    /// Path to a serialized learning-to-rank model (§4.7). Ranking falls
    /// back to the heuristic score when unset.
    #[clap(long = "ltr-model-path", env = "CLIPFEED_LTR_MODEL_PATH")]
    pub ltr_model_path: Option<String>,

    /// Admin username for `/api/admin/login` (§6). There is no `admins`
    /// table — a single operator credential is configured out of band,
    /// the way the teacher's `control-plane-api` takes its root secrets
    /// from configuration rather than the database it protects.
    #[clap(long = "admin-username", env = "CLIPFEED_ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Admin password for `/api/admin/login`. Must be set in any real
    /// deployment.
    #[clap(long = "admin-password", env = "CLIPFEED_ADMIN_PASSWORD", default_value = "development-only-insecure-secret")]
    pub admin_password: String,

    /// Stale-running-job cutoff, in minutes, for the internal reclaim
    /// watchdog route (§4.4).
    #[clap(long = "job-stale-cutoff-minutes", env = "CLIPFEED_JOB_STALE_CUTOFF_MINUTES", default_value = "120")]
    pub job_stale_cutoff_minutes: i64,
}
