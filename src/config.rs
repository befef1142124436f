use alloc::string::{String, ToString};

use crate::error::ConfigError;
use crate::mm::BASE_PAGE_SHIFT;

/// Maximum number of frames per request, one base page worth of frame numbers.
pub const FRAME_LIST_LEN: usize = (1 << BASE_PAGE_SHIFT) / core::mem::size_of::<u64>();

/// Balloon pages are 2 MiB extents by default.
pub const DEFAULT_PAGE_SHIFT: u32 = 21;

/// Memory hotplug works in sections of 128 MiB.
pub const SECTION_SIZE_SHIFT: u32 = 27;

pub const DEFAULT_MAX_SCHEDULE_DELAY: u32 = 32;

pub const DEFAULT_MAX_RETRY_COUNT: u32 = 3;

/// How many consecutive failures are tolerated before a node gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
	Unlimited,
	Limited(u32),
}

impl RetryLimit {
	pub fn is_exceeded_by(self, retry_count: u32) -> bool {
		match self {
			Self::Unlimited => false,
			Self::Limited(max) => retry_count > max,
		}
	}
}

impl core::fmt::Display for RetryLimit {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Self::Unlimited => f.write_str("unlimited"),
			Self::Limited(max) => write!(f, "{max}"),
		}
	}
}

impl core::str::FromStr for RetryLimit {
	type Err = core::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("unlimited") {
			return Ok(Self::Unlimited);
		}

		// 0 has always meant "retry forever"
		match s.parse()? {
			0 => Ok(Self::Unlimited),
			max => Ok(Self::Limited(max)),
		}
	}
}

/// Tunables of the balloon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalloonConfig {
	/// Shift of a balloon page. Extents handed to the hypervisor are
	/// `2^(page_shift - BASE_PAGE_SHIFT)` base frames large.
	pub page_shift: u32,
	/// Maximum number of extents per hypervisor request.
	pub batch_size: usize,
	pub max_schedule_delay: u32,
	pub max_retry_count: RetryLimit,
	/// Whether a hotplug collaborator, if one is provided, may be used.
	pub hotplug: bool,
	/// Serve the allocation API from hotplugged memory instead of shrinking
	/// the reservation.
	pub hotplug_unpopulated: bool,
	/// Offset targets by the distance between the static maximum and the
	/// initial reservation.
	pub static_max_offset: bool,
}

impl Default for BalloonConfig {
	fn default() -> Self {
		Self {
			page_shift: DEFAULT_PAGE_SHIFT,
			batch_size: FRAME_LIST_LEN,
			max_schedule_delay: DEFAULT_MAX_SCHEDULE_DELAY,
			max_retry_count: RetryLimit::Limited(DEFAULT_MAX_RETRY_COUNT),
			hotplug: true,
			hotplug_unpopulated: false,
			static_max_offset: false,
		}
	}
}

impl BalloonConfig {
	/// Allocation order of a balloon page in base frames.
	pub fn extent_order(&self) -> u32 {
		self.page_shift - BASE_PAGE_SHIFT
	}

	/// Number of balloon pages in one hotplug section.
	pub fn pages_per_section(&self) -> u64 {
		1 << (SECTION_SIZE_SHIFT - self.page_shift)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(BASE_PAGE_SHIFT..=SECTION_SIZE_SHIFT).contains(&self.page_shift) {
			return Err(ConfigError::PageShift(self.page_shift));
		}

		if !(1..=FRAME_LIST_LEN).contains(&self.batch_size) {
			return Err(ConfigError::BatchSize(self.batch_size));
		}

		Ok(())
	}

	/// Parses balloon options out of a kernel command line.
	///
	/// Words that are not balloon options are ignored, since the command
	/// line is shared with the rest of the kernel.
	pub fn from_cmdline(cmdline: &str) -> Result<Self, ConfigError> {
		// Split at spaces, but not while in quotes
		let tokens = shell_words::split(cmdline).map_err(|_| ConfigError::Syntax)?;
		debug!("<balloon> Got cmdline tokens as {tokens:?}");

		let mut config = Self::default();
		let mut tokeniter = tokens.into_iter();
		while let Some(token) = tokeniter.next() {
			match token.as_str() {
				"-balloon-max-retry" => {
					config.max_retry_count = parse_value(&token, tokeniter.next())?;
				}
				"-balloon-max-delay" => {
					let delay: u32 = parse_value(&token, tokeniter.next())?;
					if delay == 0 {
						return Err(ConfigError::InvalidValue {
							option: token,
							value: delay.to_string(),
						});
					}
					config.max_schedule_delay = delay;
				}
				"-balloon-batch" => {
					config.batch_size = parse_value(&token, tokeniter.next())?;
				}
				"-balloon-page-shift" => {
					config.page_shift = parse_value(&token, tokeniter.next())?;
				}
				"-balloon-hotplug" => config.hotplug = true,
				"-balloon-no-hotplug" => config.hotplug = false,
				"-balloon-hotplug-unpopulated" => config.hotplug_unpopulated = true,
				"-balloon-static-max-offset" => config.static_max_offset = true,
				_ if token.starts_with("-balloon") => {
					warn!("<balloon> Unknown cmdline option: {token} [{cmdline}]");
				}
				_ => {}
			}
		}

		config.validate()?;
		Ok(config)
	}
}

fn parse_value<T: core::str::FromStr>(option: &str, value: Option<String>) -> Result<T, ConfigError> {
	let Some(value) = value else {
		return Err(ConfigError::MissingValue {
			option: option.to_string(),
		});
	};

	value.parse().map_err(|_| ConfigError::InvalidValue {
		option: option.to_string(),
		value,
	})
}
