use std::str::FromStr;
use std::time::Duration;

use jamlist_db::SheetsConfig;
use jamlist_sync::DEFAULT_PERSISTENCE_TIMEOUT;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining background tasks on shutdown (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// Durable store selection.
    pub persistence: PersistenceConfig,
}

/// Which durable store backs the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceBackend {
    /// Spreadsheet backend.
    Sheets,
    /// Process-local store; survives nothing, useful for local runs.
    Memory,
    /// No durable store: memory-only mode.
    None,
}

impl FromStr for PersistenceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(Self::Sheets),
            "memory" => Ok(Self::Memory),
            "none" | "" => Ok(Self::None),
            other => Err(format!(
                "unknown persistence backend '{other}' (expected sheets, memory or none)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackend,
    /// Bound applied to every durable-store call.
    pub timeout: Duration,
    /// Present when `backend` is [`PersistenceBackend::Sheets`].
    pub sheets: Option<SheetsConfig>,
}

impl PersistenceConfig {
    /// Memory-only configuration.
    pub fn disabled() -> Self {
        Self {
            backend: PersistenceBackend::None,
            timeout: DEFAULT_PERSISTENCE_TIMEOUT,
            sheets: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                    |
    /// |----------------------------|--------------------------------------------|
    /// | `HOST`                     | `0.0.0.0`                                  |
    /// | `PORT`                     | `3000`                                     |
    /// | `CORS_ORIGINS`             | `*`                                        |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `5`                                        |
    /// | `PERSISTENCE_BACKEND`      | `sheets` if `GOOGLE_SHEET_ID` set, else `none` |
    /// | `GOOGLE_SHEET_ID`          | (unset)                                    |
    /// | `GOOGLE_CREDENTIALS_PATH`  | `credentials.json`                         |
    /// | `SHEET_NAME`               | `Playlist`                                 |
    /// | `PERSISTENCE_TIMEOUT_SECS` | `10`                                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let persistence = PersistenceConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            persistence,
        }
    }
}

impl PersistenceConfig {
    fn from_env() -> Self {
        let sheet_id = std::env::var("GOOGLE_SHEET_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let backend = match std::env::var("PERSISTENCE_BACKEND") {
            Ok(value) => value
                .parse()
                .unwrap_or_else(|e: String| panic!("PERSISTENCE_BACKEND: {e}")),
            Err(_) if sheet_id.is_some() => PersistenceBackend::Sheets,
            Err(_) => PersistenceBackend::None,
        };

        let timeout_secs: u64 = std::env::var("PERSISTENCE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_PERSISTENCE_TIMEOUT.as_secs().to_string())
            .parse()
            .expect("PERSISTENCE_TIMEOUT_SECS must be a valid u64");
        let timeout = Duration::from_secs(timeout_secs);

        let sheets = match backend {
            PersistenceBackend::Sheets => {
                let credentials_path = std::env::var("GOOGLE_CREDENTIALS_PATH")
                    .unwrap_or_else(|_| "credentials.json".into());
                let mut sheets = SheetsConfig::new(sheet_id.unwrap_or_default(), credentials_path);
                if let Ok(name) = std::env::var("SHEET_NAME") {
                    sheets.sheet_name = name;
                }
                sheets.request_timeout = timeout;
                Some(sheets)
            }
            _ => None,
        };

        Self {
            backend,
            timeout,
            sheets,
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
