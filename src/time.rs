use core::task::Waker;
use core::time::Duration;

/// Monotonic wall clock of the guest.
pub trait Clock: Send + Sync {
	/// Time since an arbitrary but fixed point in the past.
	fn now(&self) -> Duration;

	/// Arms a one-shot timer that wakes `waker` once [`now`](Self::now)
	/// reaches `deadline`.
	///
	/// Timers are never canceled. A stale timer only causes a spurious
	/// wakeup.
	fn wake_at(&self, deadline: Duration, waker: &Waker);
}
