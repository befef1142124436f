//! Error types of the balloon and its collaborators.

use alloc::string::String;

use thiserror::Error;

use crate::mm::NodeId;

/// Errors reported to callers of the balloon's public operations.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum BalloonError {
	/// Neither the pool nor the page allocator could provide the requested pages.
	#[error("Out of memory")]
	OutOfMemory,

	#[error("Node {node} does not exist, the balloon manages {num_nodes} nodes")]
	InvalidNode { node: NodeId, num_nodes: usize },

	/// The balloon has been shut down and no longer accepts work.
	#[error("Balloon is shut down")]
	ShutDown,
}

/// Errors of the hypervisor key/value store.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum TransportError {
	#[error("No such key")]
	NotFound,

	#[error("Malformed value")]
	Malformed,

	#[error("Store is unavailable")]
	Unavailable,
}

/// Errors while parsing the balloon configuration.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum ConfigError {
	#[error("Unable to split the command line")]
	Syntax,

	#[error("Option {option} requires a value")]
	MissingValue { option: String },

	#[error("Invalid value {value:?} for option {option}")]
	InvalidValue { option: String, value: String },

	#[error("Page shift {0} is outside of the supported range")]
	PageShift(u32),

	#[error("Batch size {0} is outside of the supported range")]
	BatchSize(usize),
}

/// Errors in a topology snapshot.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum TopologyError {
	#[error("Topology contains no nodes")]
	NoNodes,

	#[error("vCPU {vcpu} is mapped to unknown node {node}")]
	UnknownNode { vcpu: u32, node: NodeId },
}

/// Errors of a memory hotplug request.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum HotplugError {
	/// No free physical address range is large enough.
	#[error("No address space left for hotplug")]
	NoAddressSpace,

	#[error("Hotplug request was rejected")]
	Rejected,
}

/// Errors of a page range migration request.
#[derive(Error, PartialEq, Eq, Clone, Copy, Debug)]
pub enum MigrationError {
	#[error("Migration is not supported by the hypervisor")]
	Unsupported,

	#[error("Migration failed with status {0}")]
	Failed(i64),
}

/// Errors of the administrative attribute surface.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum AttributeError {
	#[error("Unknown attribute {0:?}")]
	Unknown(String),

	#[error("Attribute {0} is read-only")]
	ReadOnly(&'static str),

	#[error("Invalid value {0:?}")]
	InvalidValue(String),
}
