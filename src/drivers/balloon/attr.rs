//! Administrative attributes of the balloon.

use alloc::string::{String, ToString};
use core::str::FromStr;

use super::Balloon;
use crate::config::RetryLimit;
use crate::error::AttributeError;
use crate::mm::{kib_to_pages, pages_to_kib};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
	/// Backed memory in KiB.
	CurrentKb,
	/// Parked low memory in KiB.
	LowKb,
	/// Parked high memory in KiB.
	HighKb,
	/// Target in KiB.
	TargetKb,
	/// Target in bytes, with an optional K, M, G, T, P or E suffix on writes.
	Target,
	ScheduleDelay,
	MaxScheduleDelay,
	RetryCount,
	MaxRetryCount,
	/// Number of completed topology changes.
	TopoVersion,
}

impl Attribute {
	pub const ALL: [Self; 10] = [
		Self::CurrentKb,
		Self::LowKb,
		Self::HighKb,
		Self::TargetKb,
		Self::Target,
		Self::ScheduleDelay,
		Self::MaxScheduleDelay,
		Self::RetryCount,
		Self::MaxRetryCount,
		Self::TopoVersion,
	];

	pub const fn name(self) -> &'static str {
		match self {
			Self::CurrentKb => "current_kb",
			Self::LowKb => "low_kb",
			Self::HighKb => "high_kb",
			Self::TargetKb => "target_kb",
			Self::Target => "target",
			Self::ScheduleDelay => "schedule_delay",
			Self::MaxScheduleDelay => "max_schedule_delay",
			Self::RetryCount => "retry_count",
			Self::MaxRetryCount => "max_retry_count",
			Self::TopoVersion => "topo_version",
		}
	}

	pub const fn is_writable(self) -> bool {
		matches!(
			self,
			Self::TargetKb | Self::Target | Self::MaxScheduleDelay | Self::MaxRetryCount
		)
	}
}

impl FromStr for Attribute {
	type Err = AttributeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|attr| attr.name() == s)
			.ok_or_else(|| AttributeError::Unknown(s.to_string()))
	}
}

/// Parses a size with an optional binary suffix, e.g. `512M`.
///
/// The number may be given in decimal or, with a `0x` prefix, in hex.
pub fn memparse(s: &str) -> Option<u64> {
	let s = s.trim();

	// `E` is a hex digit, so hex numbers cannot take the exabyte suffix
	let (value, suffix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => {
			let split = hex
				.find(|c: char| !c.is_ascii_hexdigit())
				.unwrap_or(hex.len());
			let (digits, suffix) = hex.split_at(split);
			(u64::from_str_radix(digits, 16).ok()?, suffix)
		}
		None => {
			let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
			let (digits, suffix) = s.split_at(split);
			(digits.parse::<u64>().ok()?, suffix)
		}
	};

	let shift = match suffix {
		"" => 0,
		"K" | "k" => 10,
		"M" | "m" => 20,
		"G" | "g" => 30,
		"T" | "t" => 40,
		"P" | "p" => 50,
		"E" | "e" => 60,
		_ => return None,
	};

	value.checked_mul(1 << shift)
}

fn invalid(value: &str) -> AttributeError {
	AttributeError::InvalidValue(value.to_string())
}

impl Balloon {
	/// Renders the current value of `attr`.
	pub fn show(&self, attr: Attribute) -> String {
		let page_shift = self.config.page_shift;
		let stats = self.stats();

		match attr {
			Attribute::CurrentKb => pages_to_kib(stats.current_pages, page_shift).to_string(),
			Attribute::LowKb => pages_to_kib(stats.balloon_low, page_shift).to_string(),
			Attribute::HighKb => pages_to_kib(stats.balloon_high, page_shift).to_string(),
			Attribute::TargetKb => pages_to_kib(stats.target_pages, page_shift).to_string(),
			Attribute::Target => (stats.target_pages << page_shift).to_string(),
			Attribute::ScheduleDelay => stats.schedule_delay.to_string(),
			Attribute::MaxScheduleDelay => stats.max_schedule_delay.to_string(),
			Attribute::RetryCount => stats.retry_count.to_string(),
			Attribute::MaxRetryCount => stats.max_retry_count.to_string(),
			Attribute::TopoVersion => self.topology.version().to_string(),
		}
	}

	/// Writes `value` to `attr`.
	pub fn store(&self, attr: Attribute, value: &str) -> Result<(), AttributeError> {
		let page_shift = self.config.page_shift;
		let trimmed = value.trim();

		match attr {
			Attribute::TargetKb => {
				let kib: u64 = trimmed.parse().map_err(|_| invalid(value))?;
				self.store_target(kib_to_pages(kib, page_shift))
			}
			Attribute::Target => {
				let bytes = memparse(trimmed).ok_or_else(|| invalid(value))?;
				self.store_target(bytes >> page_shift)
			}
			Attribute::MaxScheduleDelay => {
				let delay: u32 = trimmed.parse().map_err(|_| invalid(value))?;
				if delay == 0 {
					return Err(invalid(value));
				}

				for stats in &mut self.state.lock().nodes {
					stats.max_schedule_delay = delay;
					stats.schedule_delay = stats.schedule_delay.min(delay);
				}
				Ok(())
			}
			Attribute::MaxRetryCount => {
				let limit = RetryLimit::from_str(trimmed).map_err(|_| invalid(value))?;
				for stats in &mut self.state.lock().nodes {
					stats.max_retry_count = limit;
				}
				Ok(())
			}
			Attribute::CurrentKb
			| Attribute::LowKb
			| Attribute::HighKb
			| Attribute::ScheduleDelay
			| Attribute::RetryCount
			| Attribute::TopoVersion => Err(AttributeError::ReadOnly(attr.name())),
		}
	}

	fn store_target(&self, target_pages: u64) -> Result<(), AttributeError> {
		info!("<balloon:attr> Setting target to {target_pages} pages");
		self.set_new_target(target_pages, None)
			.map_err(|err| AttributeError::InvalidValue(err.to_string()))
	}
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
	use super::*;

	#[test]
	fn parse_sizes() {
		assert_eq!(memparse("4096"), Some(4096));
		assert_eq!(memparse("512M"), Some(512 << 20));
		assert_eq!(memparse("2g"), Some(2 << 30));
		assert_eq!(memparse("64K\n"), Some(64 << 10));
		assert_eq!(memparse("1E"), Some(1 << 60));
		assert_eq!(memparse("0x100000"), Some(0x10_0000));
		assert_eq!(memparse("0x10M"), Some(16 << 20));
	}

	#[test]
	fn reject_malformed_sizes() {
		assert_eq!(memparse(""), None);
		assert_eq!(memparse("M"), None);
		assert_eq!(memparse("12Q"), None);
		assert_eq!(memparse("1MB"), None);
		assert_eq!(memparse("16E"), None);
	}

	#[test]
	fn attribute_names() {
		for attr in Attribute::ALL {
			assert_eq!(attr.name().parse::<Attribute>(), Ok(attr));
		}
		assert_eq!(
			"balloon_size".parse::<Attribute>(),
			Err(AttributeError::Unknown("balloon_size".to_string()))
		);
		assert!(Attribute::Target.is_writable());
		assert!(!Attribute::CurrentKb.is_writable());
	}
}
