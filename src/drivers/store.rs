//! Key/value store shared between the guest and the hypervisor.

use alloc::boxed::Box;
use alloc::string::String;

use crate::error::TransportError;
use crate::mm::NodeId;

/// Target size of the whole guest in KiB.
pub const MEMORY_TARGET: &str = "memory/target";
/// Maximum reservation of the guest in KiB.
pub const MEMORY_STATIC_MAX: &str = "memory/static-max";
/// Directory of the per-node targets.
pub const NUMA_NODE_DIR: &str = "numa/node";
/// Pending topology change, see [`TopologyChangeSignal`](crate::drivers::balloon::topology::TopologyChangeSignal).
pub const NUMA_TOPO_CHANGE: &str = "numa/topo_change";

/// Path of the target of `node` in KiB.
pub fn node_target_path(node: NodeId) -> String {
	format!("{NUMA_NODE_DIR}/{node}/target")
}

/// Callback fired with the path that changed.
pub type WatchCallback = Box<dyn Fn(&str) + Send + Sync>;

pub trait Transport: Send + Sync {
	fn read(&self, path: &str) -> Result<u64, TransportError>;

	fn write(&self, path: &str, value: u64) -> Result<(), TransportError>;

	/// Registers `callback` for changes of `path` and of everything below it.
	///
	/// Implementations may fire the callback right after registration.
	fn watch(&self, path: &str, callback: WatchCallback) -> Result<(), TransportError>;
}
