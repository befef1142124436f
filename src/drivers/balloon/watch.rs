//! Target updates pushed by the hypervisor through the store.

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};

use hermit_sync::OnceCell;

use super::Balloon;
use super::topology::TopologyChangeSignal;
use crate::drivers::store::{
	MEMORY_STATIC_MAX, MEMORY_TARGET, NUMA_NODE_DIR, NUMA_TOPO_CHANGE, WatchCallback,
	node_target_path,
};
use crate::error::TransportError;
use crate::mm::{NodeId, kib_to_pages};

/// Forwards store updates into the balloon.
pub struct TargetWatcher {
	/// Pages between the static maximum and the initial target, fixed on
	/// the first global update.
	target_diff: OnceCell<u64>,
}

impl Default for TargetWatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl TargetWatcher {
	pub const fn new() -> Self {
		Self {
			target_diff: OnceCell::new(),
		}
	}

	/// Offset subtracted from every global target.
	pub fn target_diff(&self) -> u64 {
		self.target_diff.get().copied().unwrap_or(0)
	}

	fn static_max_diff(&self, balloon: &Balloon, new_target: u64) -> u64 {
		if !balloon.config().static_max_offset {
			return 0;
		}

		let page_shift = balloon.config().page_shift;
		let static_max = match balloon.transport().read(MEMORY_STATIC_MAX) {
			Ok(kib) => kib_to_pages(kib, page_shift),
			Err(err) => {
				debug!("<balloon:watch> No static maximum ({err}), using the target");
				new_target
			}
		};

		let diff = static_max.saturating_sub(balloon.stats().target_pages);
		info!("<balloon:watch> Targets are offset by {diff} pages");
		diff
	}

	/// Handles a change of the guest-wide target.
	pub fn on_memory_target(&self, balloon: &Balloon) {
		let kib = match balloon.transport().read(MEMORY_TARGET) {
			Ok(kib) => kib,
			Err(err) => {
				debug!("<balloon:watch> Unable to read the target: {err}");
				return;
			}
		};

		let target = kib_to_pages(kib, balloon.config().page_shift);
		let diff = *self
			.target_diff
			.get_or_init(|| self.static_max_diff(balloon, target));

		if let Err(err) = balloon.set_new_target(target.saturating_sub(diff), None) {
			warn!("<balloon:watch> Unable to set the target: {err}");
		}
	}

	/// Handles a change below the per-node target directory.
	///
	/// If `path` does not name a single node, every node is reread.
	pub fn on_node_target(&self, balloon: &Balloon, path: &str) {
		let node = path
			.strip_prefix(NUMA_NODE_DIR)
			.and_then(|rest| rest.strip_prefix('/'))
			.and_then(|rest| rest.split('/').next())
			.and_then(|id| id.parse::<u32>().ok())
			.map(NodeId::new);

		match node {
			Some(node) => self.update_node(balloon, node),
			None => {
				for node in balloon.layout().node_ids() {
					self.update_node(balloon, node);
				}
			}
		}
	}

	fn update_node(&self, balloon: &Balloon, node: NodeId) {
		let kib = match balloon.transport().read(&node_target_path(node)) {
			Ok(kib) => kib,
			Err(TransportError::NotFound) => {
				trace!("<balloon:watch> No target for node {node}");
				return;
			}
			Err(err) => {
				debug!("<balloon:watch> Unable to read the target of node {node}: {err}");
				return;
			}
		};

		let target = kib_to_pages(kib, balloon.config().page_shift);
		if let Err(err) = balloon.set_new_target(target, Some(node)) {
			warn!("<balloon:watch> Unable to set the target of node {node}: {err}");
		}
	}

	/// Latches a topology change announced by the hypervisor.
	pub fn on_topology_change(&self, balloon: &Balloon) {
		let signal = TopologyChangeSignal::decode(balloon.transport().read(NUMA_TOPO_CHANGE));
		if signal == TopologyChangeSignal::None {
			return;
		}

		info!("<balloon:watch> Topology change {signal:?} announced");
		balloon.topology().latch(signal);
		balloon.wake();
	}
}

fn forward(
	balloon: &Arc<Balloon>,
	f: impl Fn(&Balloon, &str) + Send + Sync + 'static,
) -> WatchCallback {
	let balloon: Weak<Balloon> = Arc::downgrade(balloon);
	Box::new(move |path| {
		if let Some(balloon) = balloon.upgrade() {
			f(&balloon, path);
		}
	})
}

/// Registers the store watches of `balloon`.
pub fn register(balloon: &Arc<Balloon>) -> Result<(), TransportError> {
	let transport = balloon.transport();

	transport.watch(
		MEMORY_TARGET,
		forward(balloon, |balloon, _| balloon.watcher().on_memory_target(balloon)),
	)?;

	if balloon.layout().is_numa() {
		transport.watch(
			NUMA_NODE_DIR,
			forward(balloon, |balloon, path| {
				balloon.watcher().on_node_target(balloon, path);
			}),
		)?;
	}

	transport.watch(
		NUMA_TOPO_CHANGE,
		forward(balloon, |balloon, _| balloon.watcher().on_topology_change(balloon)),
	)?;

	info!("<balloon:watch> Watching targets of {} nodes", balloon.num_nodes());
	Ok(())
}
