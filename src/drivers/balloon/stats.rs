use crate::config::{BalloonConfig, RetryLimit};

/// Outcome of one reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationState {
	/// The step made progress, keep going while there is credit.
	Done,
	/// Memory was requested through hotplug and will arrive asynchronously.
	Wait,
	/// The step failed in a way that may succeed later.
	RetryableError,
	/// The node gave up after too many failures.
	Canceled,
}

/// Bookkeeping of one node, or of the whole guest for the aggregate.
///
/// All counts are in balloon pages. Outside of a running step,
/// `current_pages == total_pages - (balloon_low + balloon_high)` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationStats {
	/// Pages currently backed by the hypervisor.
	pub current_pages: u64,
	/// Pages the hypervisor wants us to hold.
	pub target_pages: u64,
	/// Parked pages in low memory.
	pub balloon_low: u64,
	/// Parked pages in high memory.
	pub balloon_high: u64,
	/// Pages known to the guest, backed or not.
	pub total_pages: u64,
	/// Pages requested through the allocation API that should not be backed.
	pub target_unpopulated: u64,
	/// Pages currently lent out. They no longer count towards `total_pages`.
	pub lent_pages: u64,
	/// Pages requested through hotplug that have not come online yet.
	pub hotplug_pending: u64,
	/// Seconds until a retry.
	pub schedule_delay: u32,
	pub max_schedule_delay: u32,
	pub retry_count: u32,
	pub max_retry_count: RetryLimit,
}

impl ReservationStats {
	pub fn new(current_pages: u64, config: &BalloonConfig) -> Self {
		Self {
			current_pages,
			target_pages: current_pages,
			balloon_low: 0,
			balloon_high: 0,
			total_pages: current_pages,
			target_unpopulated: 0,
			lent_pages: 0,
			hotplug_pending: 0,
			schedule_delay: 1,
			max_schedule_delay: config.max_schedule_delay,
			retry_count: 1,
			max_retry_count: config.max_retry_count,
		}
	}

	/// Pages still to be reclaimed (positive) or released (negative).
	pub fn credit(&self) -> i64 {
		self.target_pages as i64 - self.current_pages as i64
	}

	/// Number of parked pages.
	pub fn ballooned_pages(&self) -> u64 {
		self.balloon_low + self.balloon_high
	}

	pub fn is_inflated(&self) -> bool {
		self.ballooned_pages() > 0
	}

	pub fn is_consistent(&self) -> bool {
		self.total_pages.checked_sub(self.ballooned_pages()) == Some(self.current_pages)
	}

	/// Pages that still have to come from hotplug to reach the target.
	///
	/// Lent pages left `total_pages` but are part of `target_unpopulated`,
	/// so only requests that were not served yet add to the credit.
	pub fn hotplug_credit(&self) -> i64 {
		(self.target_pages + self.target_unpopulated) as i64
			- (self.total_pages + self.lent_pages + self.hotplug_pending) as i64
	}

	/// Feeds the outcome of a step into the backoff state machine.
	///
	/// Consecutive failures double the delay up to its maximum. Once the
	/// retry limit is exceeded the node is canceled and the ladder starts
	/// over.
	pub fn update_schedule(&mut self, state: ReconciliationState) -> ReconciliationState {
		match state {
			ReconciliationState::Wait | ReconciliationState::Canceled => state,
			ReconciliationState::Done => {
				self.reset_schedule();
				ReconciliationState::Done
			}
			ReconciliationState::RetryableError => {
				self.retry_count += 1;

				if self.max_retry_count.is_exceeded_by(self.retry_count) {
					self.reset_schedule();
					return ReconciliationState::Canceled;
				}

				self.schedule_delay = self
					.schedule_delay
					.saturating_mul(2)
					.min(self.max_schedule_delay);

				ReconciliationState::RetryableError
			}
		}
	}

	fn reset_schedule(&mut self) {
		self.schedule_delay = 1;
		self.retry_count = 1;
	}
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
	use super::*;

	fn stats(max_retry_count: RetryLimit, max_schedule_delay: u32) -> ReservationStats {
		let config = BalloonConfig {
			max_retry_count,
			max_schedule_delay,
			..Default::default()
		};
		ReservationStats::new(100, &config)
	}

	#[test]
	fn credit_and_invariant() {
		let mut stats = stats(RetryLimit::Limited(3), 32);
		assert_eq!(stats.credit(), 0);
		assert!(stats.is_consistent());
		assert!(!stats.is_inflated());

		stats.target_pages = 40;
		assert_eq!(stats.credit(), -60);

		stats.current_pages = 40;
		stats.balloon_high = 60;
		assert!(stats.is_consistent());
		assert!(stats.is_inflated());

		stats.balloon_low = 1;
		assert!(!stats.is_consistent());
	}

	#[test]
	fn backoff_doubles_until_the_maximum() {
		let mut stats = stats(RetryLimit::Unlimited, 8);

		let mut delays = vec![];
		for _ in 0..6 {
			assert_eq!(
				stats.update_schedule(ReconciliationState::RetryableError),
				ReconciliationState::RetryableError
			);
			delays.push(stats.schedule_delay);
		}

		assert_eq!(delays, [2, 4, 8, 8, 8, 8]);
		assert_eq!(stats.retry_count, 7);
	}

	#[test]
	fn retry_limit_cancels_and_resets() {
		let mut stats = stats(RetryLimit::Limited(3), 32);

		assert_eq!(
			stats.update_schedule(ReconciliationState::RetryableError),
			ReconciliationState::RetryableError
		);
		assert_eq!(
			stats.update_schedule(ReconciliationState::RetryableError),
			ReconciliationState::RetryableError
		);
		assert_eq!(stats.schedule_delay, 4);
		assert_eq!(
			stats.update_schedule(ReconciliationState::RetryableError),
			ReconciliationState::Canceled
		);
		assert_eq!(stats.schedule_delay, 1);
		assert_eq!(stats.retry_count, 1);
	}

	#[test]
	fn done_resets_the_ladder() {
		let mut stats = stats(RetryLimit::Limited(3), 32);
		stats.update_schedule(ReconciliationState::RetryableError);
		assert_eq!(stats.retry_count, 2);

		assert_eq!(
			stats.update_schedule(ReconciliationState::Done),
			ReconciliationState::Done
		);
		assert_eq!(stats.schedule_delay, 1);
		assert_eq!(stats.retry_count, 1);
	}

	#[test]
	fn wait_and_canceled_pass_through() {
		let mut stats = stats(RetryLimit::Limited(3), 32);
		stats.update_schedule(ReconciliationState::RetryableError);

		assert_eq!(
			stats.update_schedule(ReconciliationState::Wait),
			ReconciliationState::Wait
		);
		assert_eq!(
			stats.update_schedule(ReconciliationState::Canceled),
			ReconciliationState::Canceled
		);
		assert_eq!(stats.retry_count, 2);
		assert_eq!(stats.schedule_delay, 2);
	}

	#[test]
	fn hotplug_credit_accounts_for_pending_requests() {
		let mut stats = stats(RetryLimit::Limited(3), 32);
		stats.target_pages = 150;
		assert_eq!(stats.hotplug_credit(), 50);

		stats.hotplug_pending = 64;
		assert!(stats.hotplug_credit() < 0);

		stats.target_unpopulated = 20;
		stats.hotplug_pending = 0;
		assert_eq!(stats.hotplug_credit(), 70);

		// Served requests are no longer missing.
		stats.total_pages -= 20;
		stats.lent_pages = 20;
		assert_eq!(stats.hotplug_credit(), 50);
	}
}
