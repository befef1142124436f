use alloc::sync::Arc;
use core::future;

use crate::drivers::balloon::{Balloon, PassOutcome, Wakeup, watch};
use crate::error::TransportError;
use crate::executor::spawn;

/// The balloon worker.
///
/// Sleeps until the balloon is kicked or a retry delay expires, then runs a
/// reconciliation pass. Returns once the balloon is shut down.
pub async fn balloon_run(balloon: Arc<Balloon>) {
	let mut deadline = None;
	let mut timer = None;

	loop {
		let wakeup = future::poll_fn(|cx| balloon.poll_wakeup(cx, deadline, &mut timer)).await;
		if wakeup == Wakeup::Shutdown {
			break;
		}

		trace!("<balloon> Worker woke up ({wakeup:?})");
		deadline = match balloon.process().await {
			PassOutcome::Idle => None,
			PassOutcome::RetryAfter(delay) => Some(balloon.now() + delay),
		};
	}

	let parked: usize = balloon
		.layout()
		.node_ids()
		.map(|node| balloon.num_parked(node))
		.sum();
	if parked > 0 {
		warn!("<balloon> Worker stopped with {parked} extents still parked");
	} else {
		info!("<balloon> Worker stopped");
	}
}

/// Registers the store watches of `balloon` and spawns its worker on the
/// executor.
pub fn init(balloon: &Arc<Balloon>) -> Result<(), TransportError> {
	info!("<balloon> Initializing balloon with {} nodes", balloon.num_nodes());

	watch::register(balloon)?;
	balloon.print_information();
	spawn("balloon", balloon_run(balloon.clone()));

	Ok(())
}
