//! The privileged memory-operation interface of the hypervisor.

use bitflags::bitflags;

use crate::error::MigrationError;
use crate::mm::{NodeHint, NodeId};

bitflags! {
	/// Modifiers of a reservation request.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct ReservationFlags: u32 {
		/// The node hint refers to a virtual node of the guest.
		const VNODE = 1 << 17;
		/// Fail instead of falling back to another node.
		const EXACT_NODE = 1 << 16;
	}
}

/// Where a migrated range should end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationTarget {
	Node(NodeId),
	/// Let the hypervisor pick, used when a node is being dissolved.
	Unspecified,
}

/// Request to move the frames backing `start_pfn..=end_pfn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMigration {
	pub start_pfn: u64,
	pub end_pfn: u64,
	pub move_to: MigrationTarget,
}

/// Batched reservation calls.
///
/// Both reservation calls return the number of extents that were processed
/// from the front of `frames`, or a negative error code.
pub trait MemoryOp: Send {
	/// Asks the hypervisor to back the extents starting at `frames`.
	fn increase_reservation(
		&mut self,
		frames: &[u64],
		order: u32,
		node: NodeHint,
		flags: ReservationFlags,
	) -> i64;

	/// Hands the extents starting at `frames` back to the hypervisor.
	fn decrease_reservation(&mut self, frames: &[u64], order: u32, node: NodeHint) -> i64;

	fn migrate_page_range(&mut self, migration: &RangeMigration) -> Result<(), MigrationError>;
}
