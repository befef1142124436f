//! Virtual NUMA topology of the guest.

use alloc::vec::Vec;

use ahash::RandomState;
use enum_dispatch::enum_dispatch;
use hashbrown::HashMap;

use crate::drivers::balloon::hypercall::ReservationFlags;
use crate::error::TopologyError;
use crate::mm::{NodeHint, NodeId};

/// Memory of one node in base frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeMemory {
	pub start_pfn: u64,
	/// Frames between the first and the last frame of the node, holes included.
	pub spanned_pages: u64,
	/// Frames actually backed by memory.
	pub present_pages: u64,
}

impl NodeMemory {
	/// Last frame of the node.
	pub fn end_pfn(&self) -> u64 {
		(self.start_pfn + self.spanned_pages).saturating_sub(1)
	}
}

/// Topology as discovered at boot.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
	nodes: Vec<NodeMemory>,
	vcpu_to_node: HashMap<u32, NodeId, RandomState>,
}

impl TopologySnapshot {
	pub fn new(
		nodes: Vec<NodeMemory>,
		vcpu_to_node: impl IntoIterator<Item = (u32, NodeId)>,
	) -> Result<Self, TopologyError> {
		if nodes.is_empty() {
			return Err(TopologyError::NoNodes);
		}

		let mut map = HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0));
		for (vcpu, node) in vcpu_to_node {
			if node.index() >= nodes.len() {
				return Err(TopologyError::UnknownNode { vcpu, node });
			}
			map.insert(vcpu, node);
		}

		Ok(Self {
			nodes,
			vcpu_to_node: map,
		})
	}

	/// A topology without NUMA information: all memory forms one node that
	/// every vCPU belongs to.
	pub fn uniform(memory: NodeMemory, num_vcpus: u32) -> Self {
		let mut vcpu_to_node = HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0));
		vcpu_to_node.extend((0..num_vcpus).map(|vcpu| (vcpu, NodeId::new(0))));

		Self {
			nodes: vec![memory],
			vcpu_to_node,
		}
	}

	pub fn num_nodes(&self) -> usize {
		self.nodes.len()
	}

	pub fn num_vcpus(&self) -> usize {
		self.vcpu_to_node.len()
	}

	pub fn node(&self, node: NodeId) -> Option<&NodeMemory> {
		self.nodes.get(node.index())
	}

	pub fn nodes(&self) -> &[NodeMemory] {
		&self.nodes
	}

	pub fn node_of_vcpu(&self, vcpu: u32) -> Option<NodeId> {
		self.vcpu_to_node.get(&vcpu).copied()
	}
}

/// Node-specific decisions of the balloon.
#[enum_dispatch]
pub trait NodeStrategy {
	fn num_nodes(&self) -> usize;

	/// Placement hint for allocations and reservations of `node`.
	fn alloc_hint(&self, node: NodeId) -> NodeHint;

	fn reservation_flags(&self) -> ReservationFlags;

	/// Splits a guest-wide target into one target per node.
	fn split_target(&self, total: u64, targets: &mut [u64]);

	/// Frame range of `node` for migrations, if ranges can be migrated.
	fn migration_range(&self, node: NodeId) -> Option<NodeMemory>;

	/// Memory of `node` in base frames.
	fn memory(&self, node: NodeId) -> NodeMemory;
}

/// All memory is treated as one flat node.
#[derive(Debug, Clone)]
pub struct SingleNode {
	memory: NodeMemory,
}

impl NodeStrategy for SingleNode {
	fn num_nodes(&self) -> usize {
		1
	}

	fn alloc_hint(&self, _node: NodeId) -> NodeHint {
		NodeHint::Any
	}

	fn reservation_flags(&self) -> ReservationFlags {
		ReservationFlags::empty()
	}

	fn split_target(&self, total: u64, targets: &mut [u64]) {
		targets[0] = total;
	}

	fn migration_range(&self, _node: NodeId) -> Option<NodeMemory> {
		None
	}

	fn memory(&self, _node: NodeId) -> NodeMemory {
		self.memory
	}
}

/// Every virtual node is ballooned on its own.
#[derive(Debug, Clone)]
pub struct MultiNode {
	nodes: Vec<NodeMemory>,
}

impl NodeStrategy for MultiNode {
	fn num_nodes(&self) -> usize {
		self.nodes.len()
	}

	fn alloc_hint(&self, node: NodeId) -> NodeHint {
		NodeHint::Node(node)
	}

	fn reservation_flags(&self) -> ReservationFlags {
		ReservationFlags::VNODE | ReservationFlags::EXACT_NODE
	}

	fn split_target(&self, total: u64, targets: &mut [u64]) {
		let num_nodes = targets.len() as u64;
		let share = total / num_nodes;
		targets.fill(share);
		targets[0] += total % num_nodes;
	}

	fn migration_range(&self, node: NodeId) -> Option<NodeMemory> {
		self.nodes.get(node.index()).copied()
	}

	fn memory(&self, node: NodeId) -> NodeMemory {
		self.nodes[node.index()]
	}
}

#[enum_dispatch(NodeStrategy)]
#[derive(Debug, Clone)]
pub enum NodeLayout {
	SingleNode,
	MultiNode,
}

impl NodeLayout {
	/// Chooses the layout once for the lifetime of the balloon.
	///
	/// A topology that claims more nodes than there are vCPUs is not
	/// trusted and collapsed into a single node.
	pub fn from_snapshot(snapshot: &TopologySnapshot) -> Self {
		let num_nodes = snapshot.num_nodes();

		if num_nodes > 1 && num_nodes <= snapshot.num_vcpus() {
			return MultiNode {
				nodes: snapshot.nodes().to_vec(),
			}
			.into();
		}

		if num_nodes > 1 {
			warn!(
				"<balloon> Topology has {num_nodes} nodes but only {} vCPUs, treating memory as a single node",
				snapshot.num_vcpus()
			);
		}

		let start_pfn = snapshot.nodes().iter().map(|node| node.start_pfn).min().unwrap_or(0);
		let end_pfn = snapshot
			.nodes()
			.iter()
			.map(|node| node.start_pfn + node.spanned_pages)
			.max()
			.unwrap_or(start_pfn);
		let present_pages = snapshot.nodes().iter().map(|node| node.present_pages).sum();

		SingleNode {
			memory: NodeMemory {
				start_pfn,
				spanned_pages: end_pfn - start_pfn,
				present_pages,
			},
		}
		.into()
	}

	pub fn is_numa(&self) -> bool {
		matches!(self, Self::MultiNode(_))
	}

	/// All node ids in ascending order.
	pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
		(0..self.num_nodes() as u32).map(NodeId::new)
	}
}
