use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

use crate::archive::Credentials;
use crate::audit::AuditConfig;
use crate::retry::RetryConfig;
use crate::types::LogLevel;

/// Application configuration, resolved once at startup.
pub struct Config {
    pub path: PathBuf,
    pub log_file: PathBuf,
    pub bucket: String,
    pub s3_endpoint: Option<String>,
    pub ia_base_url: url::Url,
    pub credentials: Option<Credentials>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub log_level: LogLevel,
    pub audit: AuditConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("bucket", &self.bucket)
            .field("ia_base_url", &self.ia_base_url.as_str())
            .field("credentials", &self.credentials)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let ia_base_url = url::Url::parse(&cli.ia_base_url)
            .map_err(|e| anyhow::anyhow!("Invalid archive base URL '{}': {}", cli.ia_base_url, e))?;

        let credentials = match (cli.ia_user, cli.ia_password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (Some(_), None) | (None, Some(_)) => {
                anyhow::bail!("Archive login needs both IA_USER and IA_PASSWORD")
            }
            (None, None) => None,
        };

        let skip_recent = cli
            .skip_recent
            .then(|| TimeDelta::days(i64::from(cli.recent_days)));

        Ok(Self {
            path: expand_tilde(&cli.path),
            log_file: expand_tilde(&cli.log_file),
            bucket: cli.bucket,
            s3_endpoint: cli.s3_endpoint,
            ia_base_url,
            credentials,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            request_timeout: Duration::from_secs(cli.timeout),
            log_level: cli.log_level,
            audit: AuditConfig {
                skip_recent,
                retry: RetryConfig {
                    max_retries: cli.max_retries,
                    base_delay_secs: cli.retry_delay,
                    ..RetryConfig::default()
                },
                no_progress_bar: cli.no_progress_bar,
            },
        })
    }
}
