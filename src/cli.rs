use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "audit",
    about = "Audit archive page-image inventories against mirrored S3 objects"
)]
pub struct Cli {
    /// Audit JSON file mapping item identifiers to records
    pub path: String,

    /// Skip items checked within the recent window
    #[arg(long)]
    pub skip_recent: bool,

    /// Size of the --skip-recent window in days
    #[arg(long, default_value_t = 3)]
    pub recent_days: u32,

    /// Retries after a timed-out archive connection
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Base delay in seconds for exponential backoff (doubles each retry)
    #[arg(long, default_value_t = 5)]
    pub retry_delay: u64,

    /// Connect timeout in seconds for archive requests
    #[arg(long, default_value_t = 30)]
    pub connect_timeout: u64,

    /// Overall timeout in seconds for each archive request, including reading the response
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// S3 bucket holding the mirrored downloads, OCR and thumbnails
    #[arg(long, env = "AWS_S3_BUCKET")]
    pub bucket: String,

    /// Custom S3 endpoint (S3-compatible stores)
    #[arg(long, env = "AWS_S3_ENDPOINT_URL")]
    pub s3_endpoint: Option<String>,

    /// Archive account username
    #[arg(long, env = "IA_USER")]
    pub ia_user: Option<String>,

    /// Archive account password.
    /// WARNING: passing via --ia-password is visible in process listings.
    /// Prefer the IA_PASSWORD environment variable instead.
    #[arg(long, env = "IA_PASSWORD", hide_env_values = true)]
    pub ia_password: Option<String>,

    /// Archive base URL
    #[arg(long, env = "IA_BASE_URL", default_value = "https://archive.org")]
    pub ia_base_url: String,

    /// Audit log file
    #[arg(long, default_value = "tmp/audit_debug.log")]
    pub log_file: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
