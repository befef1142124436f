use alloc::boxed::Box;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicU32, Ordering};
use core::task::{Context, Poll};

/// A spawned future together with the label it is logged under.
pub(crate) struct WorkerTask {
	id: u32,
	name: &'static str,
	future: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl WorkerTask {
	pub fn new(name: &'static str, future: impl Future<Output = ()> + Send + 'static) -> Self {
		static NEXT_ID: AtomicU32 = AtomicU32::new(0);

		Self {
			id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
			name,
			future: Box::pin(future),
		}
	}

	pub fn poll(&mut self, cx: &mut Context<'_>) -> Poll<()> {
		self.future.as_mut().poll(cx)
	}
}

impl fmt::Display for WorkerTask {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.name, self.id)
	}
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
	use alloc::string::ToString;

	use super::*;

	#[test]
	fn tasks_are_labeled_uniquely() {
		let first = WorkerTask::new("balloon", async {});
		let second = WorkerTask::new("balloon", async {});

		assert!(first.to_string().starts_with("balloon#"));
		assert_ne!(first.to_string(), second.to_string());
	}
}
