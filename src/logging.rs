use core::fmt;

use hermit_sync::OnceCell;
use log::{LevelFilter, Metadata, Record, set_logger, set_max_level};

/// Destination for formatted log records.
///
/// The balloon runs inside a guest kernel and has no console of its own. The
/// embedding kernel provides one by implementing this trait.
pub trait LogSink: Sync {
	fn write_record(&self, level: log::Level, target: &str, args: fmt::Arguments<'_>);
}

/// Data structure to filter balloon messages
struct BalloonLogger {
	sink: OnceCell<&'static dyn LogSink>,
}

impl log::Log for BalloonLogger {
	fn enabled(&self, _: &Metadata<'_>) -> bool {
		self.sink.get().is_some()
	}

	fn flush(&self) {
		// nothing to do
	}

	fn log(&self, record: &Record<'_>) {
		if let Some(sink) = self.sink.get() {
			sink.write_record(
				record.level(),
				record.target(),
				format_args!("[{}] {}", record.level(), record.args()),
			);
		}
	}
}

static LOGGER: BalloonLogger = BalloonLogger {
	sink: OnceCell::new(),
};

fn max_level_from(filter: Option<&str>) -> LevelFilter {
	let Some(filter) = filter else {
		return LevelFilter::Info;
	};

	[
		LevelFilter::Off,
		LevelFilter::Error,
		LevelFilter::Warn,
		LevelFilter::Info,
		LevelFilter::Debug,
		LevelFilter::Trace,
	]
	.into_iter()
	.find(|level| level.as_str().eq_ignore_ascii_case(filter))
	.unwrap_or(LevelFilter::Info)
}

/// Installs the balloon logger with `sink` as its output.
///
/// The level filter is determined at compile time through
/// `BALLOON_LOG_LEVEL_FILTER` and defaults to `Info`. Installing a second
/// logger is a no-op, as is calling this after another crate already set
/// the global logger.
pub fn init(sink: &'static dyn LogSink) {
	if LOGGER.sink.set(sink).is_err() {
		return;
	}

	if set_logger(&LOGGER).is_err() {
		return;
	}

	set_max_level(max_level_from(option_env!("BALLOON_LOG_LEVEL_FILTER")));
}

macro_rules! infoheader {
	($str:expr) => {{
		info!("");
		info!("{:=^70}", $str);
	}};
}

macro_rules! infoentry {
	($str:expr, $rhs:expr) => (infoentry!($str, "{}", $rhs));
	($str:expr, $($arg:tt)+) => (info!("{:25}{}", concat!($str, ":"), format_args!($($arg)+)));
}

macro_rules! infofooter {
	() => {{
		info!("{:=^70}", '=');
		info!("");
	}};
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
	use super::*;

	#[test]
	fn level_filter_is_case_insensitive() {
		assert_eq!(max_level_from(Some("debug")), LevelFilter::Debug);
		assert_eq!(max_level_from(Some("WARN")), LevelFilter::Warn);
		assert_eq!(max_level_from(Some("Off")), LevelFilter::Off);
	}

	#[test]
	fn unknown_level_filter_falls_back_to_info() {
		assert_eq!(max_level_from(None), LevelFilter::Info);
		assert_eq!(max_level_from(Some("verbose")), LevelFilter::Info);
	}
}
