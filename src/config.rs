use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

/// Validated application configuration.
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub watch_directory: PathBuf,
    pub album_name: String,
    pub device_name: String,
    pub api_base: String,
    pub token_url: String,

    pub token_file: Option<PathBuf>,
    pub import_from: Option<PathBuf>,

    pub settle_interval: Duration,
    pub import_interval: Duration,
    pub request_timeout_secs: Option<u64>,

    pub notify_systemd: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("watch_directory", &self.watch_directory)
            .field("album_name", &self.album_name)
            .field("token_file", &self.token_file)
            .field("import_from", &self.import_from)
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

/// Take a required value, recording its flag name when missing or blank.
fn required(value: Option<String>, flag: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(flag);
            String::new()
        }
    }
}

fn require_dir(path: &Path, what: &str) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("{} does not exist: {}", what, path.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("{} is not a directory: {}", what, path.display());
    }
    Ok(())
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let mut missing = Vec::new();
        let client_id = required(cli.client_id, "--client-id (CLIENT_ID)", &mut missing);
        let client_secret =
            required(cli.client_secret, "--client-secret (CLIENT_SECRET)", &mut missing);
        let refresh_token =
            required(cli.refresh_token, "--refresh-token (REFRESH_TOKEN)", &mut missing);
        let watch_directory = required(
            cli.watch_directory,
            "--watch-directory (WATCH_DIRECTORY)",
            &mut missing,
        );
        let album_name = required(cli.album, "--album (ALBUM_NAME)", &mut missing);
        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }

        let watch_directory = expand_tilde(&watch_directory);
        require_dir(&watch_directory, "Watch directory")?;

        let import_from = cli.import_from.as_deref().map(expand_tilde);
        if let Some(from) = &import_from {
            require_dir(from, "Import directory")?;
            if from == &watch_directory {
                anyhow::bail!(
                    "Import directory must differ from the watch directory: {}",
                    from.display()
                );
            }
        }
        if cli.import_interval_secs == 0 {
            anyhow::bail!("--import-interval-secs must be greater than zero");
        }

        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            watch_directory,
            album_name,
            device_name: cli.device_name,
            api_base: cli.api_base,
            token_url: cli.token_url,
            token_file: cli.token_file.as_deref().map(expand_tilde),
            import_from,
            settle_interval: Duration::from_millis(cli.settle_ms),
            import_interval: Duration::from_secs(cli.import_interval_secs),
            request_timeout_secs: cli.request_timeout_secs,
            notify_systemd: cli.notify_systemd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn make_cli(watch: &Path, overrides: impl FnOnce(&mut crate::cli::Cli)) -> crate::cli::Cli {
        let mut cli = crate::cli::Cli::try_parse_from([
            "lrwatch",
            "--client-id",
            "cid",
            "--client-secret",
            "secret",
            "--refresh-token",
            "rt",
            "--album",
            "trip2024",
        ])
        .unwrap();
        cli.watch_directory = Some(watch.to_string_lossy().into_owned());
        overrides(&mut cli);
        cli
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/Pictures");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("Pictures"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_from_cli_valid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::from_cli(make_cli(dir.path(), |_| {})).unwrap();
        assert_eq!(cfg.client_id, "cid");
        assert_eq!(cfg.album_name, "trip2024");
        assert_eq!(cfg.watch_directory, dir.path());
        assert_eq!(cfg.settle_interval, Duration::from_millis(500));
        assert_eq!(cfg.import_interval, Duration::from_secs(10));
        assert!(cfg.request_timeout_secs.is_none());
        assert!(cfg.import_from.is_none());
    }

    #[test]
    fn test_from_cli_reports_all_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let cli = make_cli(dir.path(), |c| {
            c.client_secret = None;
            c.album = Some("   ".into());
        });
        let msg = Config::from_cli(cli).unwrap_err().to_string();
        assert!(msg.contains("--client-secret"));
        assert!(msg.contains("--album"));
        assert!(!msg.contains("--client-id"));
    }

    #[test]
    fn test_from_cli_keeps_album_name_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::from_cli(make_cli(dir.path(), |c| {
            c.album = Some(" Trip ".into());
        }))
        .unwrap();
        assert_eq!(cfg.album_name, " Trip ");
    }

    #[test]
    fn test_from_cli_missing_watch_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let msg = Config::from_cli(make_cli(&missing, |_| {}))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("Watch directory does not exist"));
    }

    #[test]
    fn test_from_cli_watch_directory_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let msg = Config::from_cli(make_cli(&file, |_| {}))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("not a directory"));
    }

    #[test]
    fn test_from_cli_import_from_same_as_watch() {
        let dir = tempfile::tempdir().unwrap();
        let watch = dir.path().to_path_buf();
        let cli = make_cli(&watch, |c| {
            c.import_from = Some(watch.to_string_lossy().into_owned());
        });
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_from_cli_import_from_valid() {
        let watch = tempfile::tempdir().unwrap();
        let drop_dir = tempfile::tempdir().unwrap();
        let cli = make_cli(watch.path(), |c| {
            c.import_from = Some(drop_dir.path().to_string_lossy().into_owned());
            c.import_interval_secs = 3;
        });
        let cfg = Config::from_cli(cli).unwrap();
        assert_eq!(cfg.import_from.as_deref(), Some(drop_dir.path()));
        assert_eq!(cfg.import_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::from_cli(make_cli(dir.path(), |c| {
            c.client_secret = Some("hunter2".into());
            c.refresh_token = Some("rt-secret".into());
        }))
        .unwrap();
        let out = format!("{:?}", cfg);
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("rt-secret"));
    }
}
