use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Config file read when `--config` is not given, if it exists.
const DEFAULT_CONFIG_FILE: &str = "binnit.cfg";

/// Keys accepted in the config file. Each one can also be set through the
/// environment as `BINNIT_<KEY>` (e.g. `BINNIT_PASTE_DIR`).
const KEYS: [&str; 8] = [
    "server_prefix",
    "bind_addr",
    "bind_port",
    "paste_dir",
    "templ_dir",
    "static_dir",
    "storage",
    "max_size",
];

/// Keys from older binnit config files that this server accepts but does not
/// use: the listener has no virtual hosts or TLS, and logs go to stderr.
const IGNORED_KEYS: [&str; 3] = ["server_name", "scheme", "log_file"];

/// Centralized application configuration.
///
/// Resolved from, lowest precedence first: built-in defaults, config file,
/// environment, command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Public URL prefix prepended to paste names in responses.
    pub server_prefix: String,
    pub host: String,
    pub port: u16,
    /// Directory holding the paste records.
    pub paste_dir: PathBuf,
    /// Directory searched for `index.html`.
    pub templ_dir: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Storage backend name.
    pub storage: String,
    /// Maximum paste size in bytes; longer submissions are truncated.
    pub max_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_prefix: "http://localhost".into(),
            host: "0.0.0.0".into(),
            port: 8080,
            paste_dir: "paste".into(),
            templ_dir: "tpl".into(),
            static_dir: "static".into(),
            storage: "fs".into(),
            max_size: 4096,
        }
    }
}

/// Command-line configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal no-fuss pastebin server")]
pub struct Args {
    /// Config file (default: ./binnit.cfg when present)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Public URL prefix used in paste links (overrides BINNIT_SERVER_PREFIX)
    #[arg(long)]
    pub server_prefix: Option<String>,

    /// Host to bind to (overrides BINNIT_BIND_ADDR)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BINNIT_BIND_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where pastes are stored (overrides BINNIT_PASTE_DIR)
    #[arg(long)]
    pub paste_dir: Option<PathBuf>,

    /// Directory holding index.html (overrides BINNIT_TEMPL_DIR)
    #[arg(long)]
    pub templ_dir: Option<PathBuf>,

    /// Directory served under /static (overrides BINNIT_STATIC_DIR)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Storage backend (overrides BINNIT_STORAGE)
    #[arg(long)]
    pub storage: Option<String>,

    /// Maximum paste size in bytes (overrides BINNIT_MAX_SIZE)
    #[arg(long)]
    pub max_size: Option<usize>,
}

impl AppConfig {
    /// Parse the command line, then layer config file, environment and
    /// arguments over the defaults.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        let config_file = match &args.config {
            Some(path) => Some(path.clone()),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.is_file().then_some(path)
            }
        };

        Self::resolve(args, config_file.as_deref(), |key| env::var(key).ok())
    }

    fn resolve(
        args: Args,
        config_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut cfg = Self::default();

        // --- Config file ---
        if let Some(path) = config_file {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            cfg.apply_file(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?;
        }

        // --- Environment ---
        for key in KEYS {
            let var = format!("BINNIT_{}", key.to_ascii_uppercase());
            if let Some(value) = env(&var) {
                cfg.set(key, &value)
                    .with_context(|| format!("parsing {} value `{}`", var, value))?;
            }
        }

        // --- Command line ---
        if let Some(prefix) = args.server_prefix {
            cfg.server_prefix = prefix;
        }
        if let Some(host) = args.host {
            cfg.host = host;
        }
        if let Some(port) = args.port {
            cfg.port = port;
        }
        if let Some(dir) = args.paste_dir {
            cfg.paste_dir = dir;
        }
        if let Some(dir) = args.templ_dir {
            cfg.templ_dir = dir;
        }
        if let Some(dir) = args.static_dir {
            cfg.static_dir = dir;
        }
        if let Some(storage) = args.storage {
            cfg.storage = storage;
        }
        if let Some(max_size) = args.max_size {
            cfg.max_size = max_size;
        }

        cfg.server_prefix = cfg.server_prefix.trim_end_matches('/').to_string();
        Ok(cfg)
    }

    /// Apply `key = value` lines. Blank lines and `#` comments are skipped,
    /// values may be wrapped in double quotes, unknown keys are logged and
    /// ignored.
    fn apply_file(&mut self, text: &str) -> Result<()> {
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                bail!("line {}: expected `key = value`, got `{}`", idx + 1, line);
            };
            let key = key.trim_matches(|c: char| c == ' ' || c == '\t' || c == '"');
            let value = value.trim_matches(|c: char| c == ' ' || c == '\t' || c == '"');

            if KEYS.contains(&key) {
                self.set(key, value)
                    .with_context(|| format!("line {}", idx + 1))?;
            } else if IGNORED_KEYS.contains(&key) {
                tracing::info!("config variable `{}` is not used by this server, ignoring", key);
            } else {
                tracing::warn!("ignoring unknown config variable `{}` at line {}", key, idx + 1);
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server_prefix" => self.server_prefix = value.to_string(),
            "bind_addr" => self.host = value.to_string(),
            "bind_port" => {
                self.port = value
                    .parse()
                    .with_context(|| format!("invalid bind_port `{}`", value))?
            }
            "paste_dir" => self.paste_dir = value.into(),
            "templ_dir" => self.templ_dir = value.into(),
            "static_dir" => self.static_dir = value.into(),
            "storage" => self.storage = value.to_string(),
            "max_size" => {
                self.max_size = value
                    .parse()
                    .with_context(|| format!("invalid max_size `{}`", value))?
            }
            other => bail!("unknown config variable `{}`", other),
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
