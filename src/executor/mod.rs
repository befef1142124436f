//! A minimal poll-driven executor for the balloon worker.
//!
//! The embedding kernel either spawns [`balloon_run`](balloon::balloon_run)
//! and calls [`run`] from its idle loop, or drives a single future to
//! completion with [`block_on`]. Tasks are polled with a no-op waker, so a
//! pending task is simply polled again on the next [`run`].

pub mod balloon;
pub(crate) mod task;

use alloc::vec::Vec;
use core::future::{self, Future};
use core::pin::pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll, Waker};

use hermit_sync::{InterruptTicketMutex, SpinMutex};

use crate::executor::task::WorkerTask;

static ASYNC_TASKS: InterruptTicketMutex<Vec<WorkerTask>> = InterruptTicketMutex::new(Vec::new());

/// Polls every spawned task once and drops the finished ones.
pub fn run() {
	let mut cx = Context::from_waker(Waker::noop());

	// Tasks may spawn further tasks, so they must not be polled under the lock.
	let mut tasks = core::mem::take(&mut *ASYNC_TASKS.lock());
	tasks.retain_mut(|task| match task.poll(&mut cx) {
		Poll::Ready(()) => {
			debug!("Task {task} finished");
			false
		}
		Poll::Pending => true,
	});
	ASYNC_TASKS.lock().append(&mut tasks);
}

/// Spawns a future on the executor under the label `name`.
pub fn spawn<F>(name: &'static str, future: F)
where
	F: Future<Output = ()> + Send + 'static,
{
	let task = WorkerTask::new(name, future);
	trace!("Spawn task {task}");
	ASYNC_TASKS.lock().push(task);
}

/// Number of tasks that have not finished yet.
pub fn num_tasks() -> usize {
	ASYNC_TASKS.lock().len()
}

/// Drives `future` to completion on the current core.
pub fn block_on<F: Future>(future: F) -> F::Output {
	let mut future = pin!(future);
	let mut cx = Context::from_waker(Waker::noop());

	loop {
		if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
			return output;
		}

		core::hint::spin_loop();
	}
}

/// Gives other tasks a chance to run.
pub async fn yield_now() {
	let mut yielded = false;
	future::poll_fn(|cx| {
		if yielded {
			Poll::Ready(())
		} else {
			yielded = true;
			cx.waker().wake_by_ref();
			Poll::Pending
		}
	})
	.await;
}

/// Edge-triggered wakeup of a single consumer.
#[derive(Debug, Default)]
pub(crate) struct WorkSignal {
	pending: AtomicBool,
	waker: SpinMutex<Option<Waker>>,
}

impl WorkSignal {
	pub const fn new() -> Self {
		Self {
			pending: AtomicBool::new(false),
			waker: SpinMutex::new(None),
		}
	}

	pub fn notify(&self) {
		self.pending.store(true, Ordering::Release);
		if let Some(waker) = self.waker.lock().take() {
			waker.wake();
		}
	}

	/// Consumes a pending notification.
	pub fn take(&self) -> bool {
		self.pending.swap(false, Ordering::AcqRel)
	}

	pub fn register(&self, waker: &Waker) {
		let mut slot = self.waker.lock();
		match &*slot {
			Some(registered) if registered.will_wake(waker) => {}
			_ => *slot = Some(waker.clone()),
		}
	}
}
