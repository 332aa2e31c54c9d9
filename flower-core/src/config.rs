use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use config::{FileFormat, Source};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cli;
use crate::error::{Error, Result};
use crate::registry::{OptionRegistry, OptionValue};

/// Well-known configuration file, looked up relative to the working directory.
pub const CONFIG_FILE: &str = "flowerconfig.toml";

/// Option values contributed by a single source, not yet merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    origin: String,
    values: BTreeMap<String, OptionValue>,
}

impl PartialConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Source for PartialConfig {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut map = config::Map::new();
        for (name, value) in &self.values {
            map.insert(name.clone(), config::Value::from(value.clone()));
        }
        Ok(map)
    }
}

/// Final value of every registered option. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub help: bool,
    pub version: bool,
    pub port: u16,
    pub address: String,
    pub debug: bool,
    pub inspect: bool,
    /// Milliseconds.
    pub inspect_timeout: f64,
    pub auth: String,
    pub basic_auth: Vec<String>,
    pub url_prefix: Option<String>,
    pub max_tasks: u64,
    pub db: String,
    pub persistent: bool,
    pub broker_api: Option<String>,
    pub broker: Option<String>,
    pub certfile: Option<String>,
    pub keyfile: Option<String>,
    pub xheaders: bool,
    pub auto_refresh: bool,
    pub cookie_secret: Option<String>,
}

impl ResolvedConfig {
    /// True when both TLS files are configured. Empty paths count as unset.
    pub fn is_secure(&self) -> bool {
        let set = |path: &Option<String>| path.as_deref().is_some_and(|p| !p.is_empty());
        set(&self.certfile) && set(&self.keyfile)
    }

    /// Address operators can reach the dashboard at.
    pub fn reachable_at(&self) -> String {
        let scheme = if self.is_secure() { "https" } else { "http" };
        let host = if self.address.is_empty() {
            "localhost"
        } else {
            self.address.as_str()
        };
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

/// Reads the optional configuration file.
///
/// A missing file yields an empty layer. Any other failure, including a
/// value that cannot be coerced to its option's kind, is fatal.
pub fn load_file(registry: &OptionRegistry, path: &Path) -> Result<PartialConfig> {
    let mut partial = PartialConfig::new(path.display().to_string());

    match std::fs::metadata(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Flower configfile not found: {}", path.display());
            return Ok(partial);
        }
        Err(e) => return Err(e.into()),
        Ok(_) => {}
    }

    let malformed = |source: config::ConfigError| Error::ConfigFileMalformed {
        path: path.to_path_buf(),
        source,
    };

    let table = config::File::new(&path.to_string_lossy(), FileFormat::Toml)
        .required(true)
        .collect()
        .map_err(malformed)?;

    for (key, value) in table {
        let name = key.replace('-', "_");
        let Some(spec) = registry.get(&name) else {
            debug!("Ignoring unknown option `{}` in {}", key, path.display());
            continue;
        };
        let value = spec
            .coerce(value)
            .map_err(|e| malformed(config::ConfigError::Message(e.to_string())))?;
        partial.insert(name, value);
    }

    info!("Parsed Flower configfile {}", path.display());
    Ok(partial)
}

/// Parses filtered `--name[=value]` tokens into typed values.
///
/// Tokens are expected to have passed [`crate::filter::filter_args`]; anything
/// unrecognized here is an error. A repeated option keeps its last value.
pub fn parse_args<S: AsRef<str>>(registry: &OptionRegistry, tokens: &[S]) -> Result<PartialConfig> {
    cli::parse(registry, tokens)
}

/// Layers `defaults < file < args` key by key.
pub fn merge(
    registry: &OptionRegistry,
    file: PartialConfig,
    args: PartialConfig,
) -> Result<ResolvedConfig> {
    let mut builder = config::Config::builder();
    for spec in registry.iter() {
        if let Some(default) = spec.default_value() {
            builder = builder.set_default(spec.name(), config::Value::from(default.clone()))?;
        }
    }

    let resolved = builder
        .add_source(file)
        .add_source(args)
        .build()?
        .try_deserialize::<ResolvedConfig>()?;

    Ok(resolved)
}

/// Runs the whole resolution: configuration file, then filtered arguments.
pub fn resolve<S: AsRef<str>>(
    registry: &OptionRegistry,
    config_file: &Path,
    tokens: &[S],
) -> Result<ResolvedConfig> {
    let file = load_file(registry, config_file)?;
    let args = parse_args(registry, tokens)?;
    debug!(
        "Resolving configuration from {} values in {} and {} from {}",
        file.len(),
        file.origin(),
        args.len(),
        args.origin()
    );
    merge(registry, file, args)
}
