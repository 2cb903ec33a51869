//! Settings file handling.
//!
//! Configuration is read once from `Settings-default.toml` / `Settings.toml`
//! in the working directory (both optional, the latter overriding the
//! former), then from `GEOPROC`-prefixed environment variables with `__` as
//! the nesting separator. Every key carries a default so the server boots
//! without any settings file.

use std::sync::RwLock;

use config::{Config, Environment, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{self, Error, Result};

use geoproc_operators::cache::CacheConfig;

lazy_static! {
    static ref SETTINGS: RwLock<Config> = RwLock::new(build_settings());
}

fn build_settings() -> Config {
    Config::builder()
        .set_default("server.bind", "127.0.0.1:10042")
        .and_then(|b| b.set_default("server.workers", 4_i64))
        .and_then(|b| b.set_default("server.queue_size", 32_i64))
        .and_then(|b| b.set_default("cache.enabled", true))
        .and_then(|b| b.set_default("cache.policy", "lru"))
        .and_then(|b| b.set_default("cache.temporal_bound", "closed"))
        .and_then(|b| b.set_default("cache.raster_size", 5_i64 * 1024 * 1024))
        .and_then(|b| b.set_default("cache.vector_size", 1024_i64 * 1024))
        .and_then(|b| b.set_default("cache.plot_size", 256_i64 * 1024))
        .and_then(|b| b.set_default("logging.level", "info"))
        .expect("the default configuration must be valid")
        .add_source(File::with_name("Settings-default").required(false))
        .add_source(File::with_name("Settings").required(false))
        .add_source(Environment::with_prefix("geoproc").separator("__"))
        .build()
        .expect("the configuration must be loadable")
}

pub trait ConfigElement {
    const KEY: &'static str;
}

pub fn get_config_element<T>() -> Result<T>
where
    T: ConfigElement + for<'de> Deserialize<'de>,
{
    SETTINGS
        .read()
        .map_err(|_| Error::ConfigLockFailed)?
        .get::<T>(T::KEY)
        .context(error::Config)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// listen address, e.g. `127.0.0.1:10042`
    pub bind: String,
    /// number of worker tasks evaluating requests
    pub workers: usize,
    /// bound of the job queue between connections and workers
    pub queue_size: usize,
}

impl ConfigElement for Server {
    const KEY: &'static str = "server";
}

impl ConfigElement for CacheConfig {
    const KEY: &'static str = "cache";
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: String,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_available_without_a_settings_file() {
        let server = get_config_element::<Server>().unwrap();
        assert_eq!(server.workers, 4);

        let cache = get_config_element::<CacheConfig>().unwrap();
        assert!(cache.enabled);
        assert_eq!(cache.raster_size, 5 * 1024 * 1024);
    }
}
