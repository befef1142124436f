//! Coordination of the balloon with changes of the virtual NUMA topology.
//!
//! The hypervisor announces a pending change through the store. The balloon
//! latches the announcement, migrates node ranges around its next pass and
//! acknowledges the change once the pass went through without retries.

use alloc::vec::Vec;
use core::future;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use core::task::{Poll, Waker};

use hermit_sync::SpinMutex;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::TransportError;
use crate::mm::NodeId;

/// Pending topology change as published in the store.
#[derive(TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Clone, Copy, Debug, Default)]
#[repr(u8)]
pub enum TopologyChangeSignal {
	#[default]
	None = 0,
	NodesAdded = 1,
	NodesRemoved = 2,
}

impl TopologyChangeSignal {
	/// Decodes a value read from the store.
	///
	/// A store that cannot be read or holds garbage announces nothing.
	pub fn decode(raw: Result<u64, TransportError>) -> Self {
		let raw = match raw {
			Ok(raw) => raw,
			Err(TransportError::NotFound) => return Self::None,
			Err(err) => {
				debug!("<balloon:topology> Unable to read topology change: {err}");
				return Self::None;
			}
		};

		u8::try_from(raw)
			.ok()
			.and_then(|raw| Self::try_from(raw).ok())
			.unwrap_or_else(|| {
				warn!("<balloon:topology> Ignoring unknown topology change {raw}");
				Self::None
			})
	}
}

#[derive(Debug, Default)]
struct NodeFence {
	fenced: AtomicBool,
	touches: AtomicUsize,
}

/// Latched topology signal, topology version and the touch fences of all
/// nodes.
#[derive(Debug)]
pub struct TopologyCoordinator {
	signal: AtomicU8,
	version: AtomicU64,
	fences: Vec<NodeFence>,
	drained: SpinMutex<Option<Waker>>,
}

impl TopologyCoordinator {
	pub fn new(num_nodes: usize) -> Self {
		Self {
			signal: AtomicU8::new(TopologyChangeSignal::None.into()),
			version: AtomicU64::new(0),
			fences: (0..num_nodes).map(|_| NodeFence::default()).collect(),
			drained: SpinMutex::new(None),
		}
	}

	/// The latched signal.
	pub fn signal(&self) -> TopologyChangeSignal {
		TopologyChangeSignal::try_from(self.signal.load(Ordering::Acquire)).unwrap_or_default()
	}

	/// Latches `signal` until it is acknowledged.
	pub fn latch(&self, signal: TopologyChangeSignal) {
		self.signal.store(signal.into(), Ordering::Release);
	}

	/// Clears the latched signal unless a newer one arrived in the meantime.
	pub(crate) fn acknowledge(&self, signal: TopologyChangeSignal) {
		let _ = self.signal.compare_exchange(
			signal.into(),
			TopologyChangeSignal::None.into(),
			Ordering::AcqRel,
			Ordering::Acquire,
		);
	}

	/// Number of topology changes the balloon has gone through.
	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	pub(crate) fn bump_version(&self) -> u64 {
		self.version.fetch_add(1, Ordering::AcqRel) + 1
	}

	/// Announces new allocation activity on `node`.
	///
	/// Returns `None` while the node is fenced because it is being removed.
	/// The activity lasts until the returned guard is dropped.
	pub fn begin_touch(&self, node: NodeId) -> Option<TouchGuard<'_>> {
		let fence = self.fences.get(node.index())?;
		fence.touches.fetch_add(1, Ordering::SeqCst);

		let guard = TouchGuard {
			fence,
			drained: &self.drained,
		};

		if fence.fenced.load(Ordering::SeqCst) {
			drop(guard);
			return None;
		}

		Some(guard)
	}

	pub fn is_fenced(&self, node: NodeId) -> bool {
		self.fences
			.get(node.index())
			.is_some_and(|fence| fence.fenced.load(Ordering::SeqCst))
	}

	pub(crate) fn fence(&self, node: NodeId) {
		if let Some(fence) = self.fences.get(node.index()) {
			fence.fenced.store(true, Ordering::SeqCst);
		}
	}

	pub(crate) fn unfence_all(&self) {
		for fence in &self.fences {
			fence.fenced.store(false, Ordering::SeqCst);
		}
	}

	fn is_drained(&self) -> bool {
		self.fences.iter().all(|fence| {
			!fence.fenced.load(Ordering::SeqCst) || fence.touches.load(Ordering::SeqCst) == 0
		})
	}

	/// Waits until no touch is pending on any fenced node.
	pub(crate) async fn drained(&self) {
		future::poll_fn(|cx| {
			if self.is_drained() {
				return Poll::Ready(());
			}

			*self.drained.lock() = Some(cx.waker().clone());

			if self.is_drained() {
				Poll::Ready(())
			} else {
				Poll::Pending
			}
		})
		.await;
	}
}

/// Pending allocation activity on a node, see
/// [`TopologyCoordinator::begin_touch`].
#[derive(Debug)]
pub struct TouchGuard<'a> {
	fence: &'a NodeFence,
	drained: &'a SpinMutex<Option<Waker>>,
}

impl Drop for TouchGuard<'_> {
	fn drop(&mut self) {
		if self.fence.touches.fetch_sub(1, Ordering::SeqCst) != 1 {
			return;
		}

		if let Some(waker) = self.drained.lock().take() {
			waker.wake();
		}
	}
}
