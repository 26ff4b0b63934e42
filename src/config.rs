/// Engine configuration (§9 "Global mutable state" rules out a
/// process-wide singleton for this component): callers build one
/// `EngineConfig` per store and pass it to `Engine::open`. Loading still
/// follows the `config` crate's builder pattern (TOML file plus
/// environment overrides).
use std::error::Error;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the RocksDB directory, or `None` for an in-memory store.
    pub db_path: Option<String>,
    /// Buffered ops in a `StoreTransaction` before a caller is nudged to
    /// commit (advisory; the engine itself commits once per
    /// `process_block`/`rollback_to` call regardless).
    pub flush_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            flush_threshold: 10_000,
        }
    }
}

impl EngineConfig {
    /// Loads from `config.toml` (section `[engine]`) plus
    /// `LEDGERSTATE_*` environment overrides, following the project's
    /// usual `config::Config::builder()` pattern.
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LEDGERSTATE").separator("_"))
            .build()?;

        let db_path = raw.get_string("engine.db_path").ok();
        let flush_threshold = raw
            .get_int("engine.flush_threshold")
            .unwrap_or(10_000)
            .max(1) as usize;

        Ok(Self {
            db_path,
            flush_threshold,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            db_path: None,
            ..Default::default()
        }
    }

    pub fn on_disk(path: impl Into<String>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Default::default()
        }
    }
}
