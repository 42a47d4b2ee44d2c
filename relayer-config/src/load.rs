//! Reads the TOML file named by [`crate::cli::Args`], applies its CLI/env
//! overrides, and resolves the result into [`crate::resolve::ResolvedConfig`].

use crate::cli::Args;
use crate::error::{Error, Result};
use crate::raw::RawConfig;
use crate::resolve::{self, ResolvedConfig};
use std::path::Path;

pub fn load(args: &Args) -> Result<ResolvedConfig> {
	let mut raw = read_raw(&args.config)?;
	apply_overrides(&mut raw, args);
	resolve::resolve(raw)
}

fn read_raw(path: &Path) -> Result<RawConfig> {
	let contents = std::fs::read_to_string(path)
		.map_err(|source| Error::Read { path: path.display().to_string(), source })?;
	toml::from_str(&contents).map_err(|source| Error::Parse { path: path.display().to_string(), source: Box::new(source) })
}

fn apply_overrides(raw: &mut RawConfig, args: &Args) {
	if let Some(level) = &args.log_level {
		raw.logging.level = level.clone();
	}
	if let Some(redis_url) = &args.redis_url {
		raw.persister.connection_string = redis_url.clone();
	}
	if let Some(enabled) = args.metrics_enabled {
		raw.metrics.enabled = enabled;
	}
	if let Some(addr) = args.metrics_addr {
		raw.metrics.host = addr.ip().to_string();
		raw.metrics.port = addr.port();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::raw::RawLoggingConfig;

	#[test]
	fn overrides_only_touch_fields_that_were_set() {
		let mut raw = RawConfig { logging: RawLoggingConfig { level: "warn".to_string(), ..Default::default() }, ..Default::default() };
		let args = Args {
			config: "unused.toml".into(),
			log_level: None,
			redis_url: Some("redis://example:6379".to_string()),
			metrics_enabled: None,
			metrics_addr: None,
		};
		apply_overrides(&mut raw, &args);
		assert_eq!(raw.logging.level, "warn");
		assert_eq!(raw.persister.connection_string, "redis://example:6379");
	}
}
