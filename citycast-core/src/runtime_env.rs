//! Runtime credential discovery.
//!
//! The API key may be injected when the container starts rather than at
//! build time: as a process environment variable, or as a `KEY=VALUE` file
//! written by the entrypoint (which can appear slightly after the process
//! starts). [`RuntimeEnv::resolve`] polls the configured sources on a fixed
//! interval until one of them carries the key or the attempt budget runs
//! out, then freezes the result. Nothing observes the sources afterwards.
//!
//! A blank value counts as not provided, so an empty `-e VAR=` never hides a
//! key further down the list. Sources that cannot change after start-up (the
//! stored config) belong in the `fallback` of [`RuntimeEnv::resolve_with_fallback`]:
//! they are consulted once, only after the runtime sources are exhausted.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

/// The one variable this program recognizes.
pub const API_KEY_VAR: &str = "VITE_OPENWEATHER_API_KEY";

/// Value shipped in sample env files; never a real key.
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

/// OpenWeatherMap keys are 32 hex characters.
pub const EXPECTED_KEY_LEN: usize = 32;

/// A place the credential can come from.
pub trait EnvSource: Send + Sync + Debug {
    /// `Some` as soon as the source defines `name`, even if the value is empty.
    fn lookup(&self, name: &str) -> Option<String>;

    /// Short human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn describe(&self) -> String {
        "process environment".to_string()
    }
}

/// A `KEY=VALUE` file written at container start.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is allowed,
/// and values may be wrapped in single or double quotes. A file that does not
/// exist yet simply has no keys.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EnvSource for EnvFile {
    fn lookup(&self, name: &str) -> Option<String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to read env file");
                return None;
            }
        };

        parse_env_file(&contents).remove(name)
    }

    fn describe(&self) -> String {
        format!("env file {}", self.path.display())
    }
}

/// In-memory variables, for embedding hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        MapEnv(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl EnvSource for MapEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }

    fn describe(&self) -> String {
        "in-memory env".to_string()
    }
}

/// How long to wait for a source to provide the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    pub interval: Duration,
    /// Total lookups, including the first immediate one. Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 50,
        }
    }
}

impl DiscoveryPolicy {
    /// Look once and never wait.
    pub const fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts: 1,
        }
    }
}

/// Outcome of discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { source: String },
    /// Terminal: no source defined the key within the attempt budget.
    Unavailable { attempts: u32 },
}

/// Quick sanity classification of the configured key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCheck {
    Missing,
    Placeholder,
    UnexpectedLength(usize),
    LooksValid,
}

impl KeyCheck {
    pub fn describe(&self) -> String {
        match self {
            KeyCheck::Missing => format!(
                "No API key found. Set {API_KEY_VAR} or run `citycast configure`."
            ),
            KeyCheck::Placeholder => {
                "Using placeholder API key. Replace it with your own key.".to_string()
            }
            KeyCheck::UnexpectedLength(len) => format!(
                "API key length is {len}, expected {EXPECTED_KEY_LEN}. Check your API key format."
            ),
            KeyCheck::LooksValid => "API key looks valid.".to_string(),
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, KeyCheck::LooksValid)
    }
}

/// Frozen view of the runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    api_key: Option<String>,
    resolution: Resolution,
}

impl RuntimeEnv {
    /// Check the sources once, in order.
    pub fn from_sources(sources: &[&dyn EnvSource]) -> Self {
        Self::scan(sources).unwrap_or_else(|| Self::unavailable(1))
    }

    /// Poll the sources until one defines the key or the policy is exhausted.
    pub async fn resolve(sources: &[&dyn EnvSource], policy: DiscoveryPolicy) -> Self {
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(env) = Self::scan(sources) {
                return env;
            }
            if attempt < attempts {
                tracing::debug!(attempt, "{API_KEY_VAR} not found yet, will retry");
                tokio::time::sleep(policy.interval).await;
            }
        }

        tracing::info!(attempts, "{API_KEY_VAR} not provided at runtime");
        Self::unavailable(attempts)
    }

    /// Poll `runtime` under `policy`; only if that ends `Unavailable`, check
    /// `fallback` once.
    pub async fn resolve_with_fallback(
        runtime: &[&dyn EnvSource],
        fallback: &[&dyn EnvSource],
        policy: DiscoveryPolicy,
    ) -> Self {
        let env = Self::resolve(runtime, policy).await;
        if env.api_key.is_some() {
            return env;
        }

        Self::scan(fallback).unwrap_or_else(|| {
            tracing::info!("Continuing without a credential");
            env
        })
    }

    fn scan(sources: &[&dyn EnvSource]) -> Option<Self> {
        sources.iter().find_map(|source| {
            let value = source.lookup(API_KEY_VAR)?.trim().to_string();
            let origin = source.describe();
            if value.is_empty() {
                tracing::debug!(source = %origin, "Ignoring blank {API_KEY_VAR}");
                return None;
            }
            tracing::info!(source = %origin, length = value.len(), "Found {API_KEY_VAR}");
            Some(Self {
                api_key: Some(value),
                resolution: Resolution::Found { source: origin },
            })
        })
    }

    fn unavailable(attempts: u32) -> Self {
        Self {
            api_key: None,
            resolution: Resolution::Unavailable { attempts },
        }
    }

    /// Raw value for a recognized key. Every other key is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == API_KEY_VAR {
            self.api_key.as_deref()
        } else {
            None
        }
    }

    /// The credential, if one was found.
    pub fn api_key(&self) -> Option<&str> {
        self.get(API_KEY_VAR)
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn check(&self) -> KeyCheck {
        match self.api_key() {
            None => KeyCheck::Missing,
            Some(PLACEHOLDER_KEY) => KeyCheck::Placeholder,
            Some(key) if key.len() != EXPECTED_KEY_LEN => KeyCheck::UnexpectedLength(key.len()),
            Some(_) => KeyCheck::LooksValid,
        }
    }
}

fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        vars.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
