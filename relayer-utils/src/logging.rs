//! Process-wide logger initialisation.
//!
//! Workers log with `log::{debug,info,warn,error}!(target: "relayer::<component>", ...)`,
//! matching this codebase's convention of tagging every log line with the
//! subsystem that emitted it (there, `target: "bridge"`; here, one target per
//! component so operators can filter per-worker).

use std::io::Write;

/// Logging configuration, read once at process startup.
#[derive(Debug, Clone)]
pub struct LoggerOptions {
	/// `env_logger`-style filter string, e.g. `"relayer=debug,warn"`.
	pub filter: String,
	/// Whether to emit ANSI colour codes (disable for non-tty log shipping).
	pub color: bool,
}

impl Default for LoggerOptions {
	fn default() -> Self {
		LoggerOptions { filter: "info".to_string(), color: true }
	}
}

/// Initialise the global logger. Must be called exactly once, before any
/// worker is spawned.
pub fn init(options: &LoggerOptions) {
	let mut builder = env_logger::Builder::new();
	builder.parse_filters(&options.filter);
	builder.format(move |buf, record| {
		let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
		writeln!(
			buf,
			"{} {} {}: {}",
			now.format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
			record.level(),
			record.target(),
			record.args(),
		)
	});
	builder.write_style(if options.color { env_logger::WriteStyle::Auto } else { env_logger::WriteStyle::Never });
	builder.init();
}
