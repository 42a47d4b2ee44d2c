//! Prometheus metrics shared across workers, plus a small helper for scraping a
//! float out of a JSON HTTP response (used by the `coin-gecko` pricing provider).

use crate::error::{Error, Result};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::{
	net::SocketAddr,
	sync::{Arc, Mutex},
	time::Duration,
};
use sysinfo::{Pid, RefreshKind, System};

/// Global, process-wide update interval for [`GlobalMetrics`].
const GLOBAL_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// Prefix applied to every metric name registered by this process.
pub fn metric_name(prefix: Option<&str>, name: &str) -> String {
	match prefix {
		Some(prefix) => format!("{prefix}_{name}"),
		None => name.to_string(),
	}
}

/// System-wide Prometheus metrics (load average, process CPU/RSS), mirroring
/// what every long-running relay instance in this codebase exposes alongside
/// its component-specific gauges.
#[derive(Clone)]
pub struct GlobalMetrics {
	system: Arc<Mutex<System>>,
	system_average_load: GaugeVec,
	process_cpu_usage_percentage: Gauge,
	process_memory_usage_bytes: Gauge,
}

impl GlobalMetrics {
	/// Create and register the global metrics with `registry`.
	pub fn new(registry: &Registry) -> Result<Self> {
		let system_average_load = GaugeVec::new(
			Opts::new(metric_name(None, "system_average_load"), "System load average"),
			&["over"],
		)?;
		let process_cpu_usage_percentage = Gauge::new(
			metric_name(None, "process_cpu_usage_percentage"),
			"Process CPU usage",
		)?;
		let process_memory_usage_bytes = Gauge::new(
			metric_name(None, "process_memory_usage_bytes"),
			"Process memory (resident set size) usage, in bytes",
		)?;

		registry.register(Box::new(system_average_load.clone()))?;
		registry.register(Box::new(process_cpu_usage_percentage.clone()))?;
		registry.register(Box::new(process_memory_usage_bytes.clone()))?;

		Ok(GlobalMetrics {
			system: Arc::new(Mutex::new(System::new_with_specifics(RefreshKind::everything()))),
			system_average_load,
			process_cpu_usage_percentage,
			process_memory_usage_bytes,
		})
	}

	/// Refresh the metrics from the OS. Intended to be called on a fixed
	/// interval by a dedicated background task.
	pub fn update(&self) {
		let load = System::load_average();
		self.system_average_load.with_label_values(&["1min"]).set(load.one);
		self.system_average_load.with_label_values(&["5min"]).set(load.five);
		self.system_average_load.with_label_values(&["15min"]).set(load.fifteen);

		let mut system = self.system.lock().expect("metrics system lock is never poisoned; qed");
		let Some(pid) = sysinfo::get_current_pid().ok() else {
			log::warn!(target: "relayer::metrics", "failed to read current pid; process metrics left stale");
			return;
		};
		if system.refresh_process(pid) {
			if let Some(process) = system.process(pid as Pid) {
				self.process_cpu_usage_percentage.set(process.cpu_usage() as f64);
				self.process_memory_usage_bytes.set((process.memory() * 1024) as f64);
			}
		} else {
			log::warn!(target: "relayer::metrics", "failed to refresh process information");
		}
	}

	/// Spawn the periodic refresh task. Runs until the process exits.
	pub fn spawn(self) {
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(GLOBAL_UPDATE_INTERVAL);
			loop {
				interval.tick().await;
				self.update();
			}
		});
	}
}

/// Serve the Prometheus text exposition format for `registry` on `addr` until
/// the process exits. Intentionally minimal: a single `/metrics` endpoint, no
/// TLS, no auth — matching the scope of the metrics surfaces in this codebase.
pub async fn serve(registry: Registry, addr: SocketAddr) -> Result<()> {
	use tokio::io::AsyncWriteExt;
	use tokio::net::TcpListener;

	let listener = TcpListener::bind(addr)
		.await
		.map_err(|err| Error::InvalidMetricsAddress(format!("{addr}: {err}")))?;
	log::info!(target: "relayer::metrics", "serving prometheus metrics on {addr}");

	loop {
		let (mut socket, _) = match listener.accept().await {
			Ok(accepted) => accepted,
			Err(err) => {
				log::warn!(target: "relayer::metrics", "failed to accept metrics connection: {err}");
				continue;
			}
		};

		let registry = registry.clone();
		tokio::spawn(async move {
			let metric_families = registry.gather();
			let mut buffer = Vec::new();
			if TextEncoder::new().encode(&metric_families, &mut buffer).is_err() {
				return;
			}

			let response = format!(
				"HTTP/1.1 200 OK\r\ncontent-type: text/plain; version=0.0.4\r\ncontent-length: {}\r\n\r\n",
				buffer.len()
			);
			let _ = socket.write_all(response.as_bytes()).await;
			let _ = socket.write_all(&buffer).await;
		});
	}
}

/// Select a positive, normal `f64` out of a JSON response using a JSONPath
/// expression. Used by the `coin-gecko` pricing provider to read e.g.
/// `$.ethereum.usd` out of `{"ethereum":{"usd":3000.1}}`.
pub fn select_f64(json_path: &str, response: &str) -> Result<f64> {
	let json: serde_json::Value =
		serde_json::from_str(response).map_err(|err| Error::ParseHttp(err, response.to_string()))?;

	let mut selector = jsonpath_lib::selector(&json);
	let selected = selector(json_path)
		.map_err(|err| Error::SelectResponseValue(err, response.to_string()))?;
	let value = selected
		.first()
		.and_then(|v| v.as_f64())
		.ok_or_else(|| Error::MissingResponseValue(response.to_string()))?;

	if !value.is_normal() || value < 0.0 {
		return Err(Error::ParseFloat(value));
	}

	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn select_f64_works() {
		assert_eq!(select_f64("$.kusama.usd", r#"{"kusama":{"usd":433.05}}"#).unwrap(), 433.05);
	}

	#[test]
	fn select_f64_rejects_negative_numbers() {
		assert!(select_f64("$.kusama.usd", r#"{"kusama":{"usd":-433.05}}"#).is_err());
	}

	#[test]
	fn select_f64_rejects_zero() {
		assert!(select_f64("$.kusama.usd", r#"{"kusama":{"usd":0.0}}"#).is_err());
	}

	#[test]
	fn select_f64_rejects_missing_path() {
		assert!(select_f64("$.missing", r#"{"kusama":{"usd":1.0}}"#).is_err());
	}
}
