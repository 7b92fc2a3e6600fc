use clap::Parser;

use crate::lightroom::endpoints::{DEFAULT_API_BASE, DEFAULT_TOKEN_URL};
use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "lrwatch",
    about = "Upload new JPEGs from a directory into a Lightroom album"
)]
pub struct Cli {
    /// Adobe API client id (also sent as X-API-Key)
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// Adobe API client secret.
    /// Prefer the CLIENT_SECRET environment variable; arguments are visible in process listings.
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth refresh token used to obtain access tokens
    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Directory to watch for new photos
    #[arg(short = 'd', long, env = "WATCH_DIRECTORY")]
    pub watch_directory: Option<String>,

    /// Name of the Lightroom album new photos are added to
    #[arg(short = 'a', long = "album", env = "ALBUM_NAME")]
    pub album: Option<String>,

    /// File that stores the latest (rotated) refresh token
    #[arg(long, env = "TOKEN_FILE")]
    pub token_file: Option<String>,

    /// Device name recorded as the import source
    #[arg(long, default_value = "lrwatch")]
    pub device_name: String,

    /// Interval in milliseconds between size checks while a new file settles
    #[arg(long, default_value_t = 500)]
    pub settle_ms: u64,

    /// HTTP request timeout in seconds (no timeout when unset)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Periodically move files from this directory into the watch directory
    #[arg(long)]
    pub import_from: Option<String>,

    /// Seconds between mover passes
    #[arg(long, default_value_t = 10)]
    pub import_interval_secs: u64,

    /// Lightroom API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,

    /// Adobe IMS token endpoint
    #[arg(long, default_value = DEFAULT_TOKEN_URL, hide = true)]
    pub token_url: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Send sd_notify readiness and status messages
    #[arg(long)]
    pub notify_systemd: bool,
}
