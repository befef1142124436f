//! Guest memory primitives shared by the balloon and its page allocator.

pub mod pool;

use core::fmt;

/// Shift of a base page as used by the hypervisor's frame numbers.
pub const BASE_PAGE_SHIFT: u32 = 12;

/// Index of a (virtual) NUMA node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(u32);

impl NodeId {
	pub const fn new(id: u32) -> Self {
		Self(id)
	}

	pub const fn id(self) -> u32 {
		self.0
	}

	pub const fn index(self) -> usize {
		self.0 as usize
	}
}

impl From<u32> for NodeId {
	fn from(id: u32) -> Self {
		Self(id)
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Placement request for an allocation or a hypervisor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeHint {
	/// The caller does not care where the memory comes from.
	Any,
	Node(NodeId),
}

impl NodeHint {
	/// The requested node, if any.
	pub const fn node(self) -> Option<NodeId> {
		match self {
			Self::Any => None,
			Self::Node(node) => Some(node),
		}
	}
}

/// Handle of an extent of `2^order` contiguous base frames.
///
/// The handle does not own the memory. Whoever holds it is responsible for
/// the frames, be it the page allocator, the balloon pool, or a caller of
/// [`Balloon::alloc_ballooned_pages`](crate::Balloon::alloc_ballooned_pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
	pfn: u64,
	node: NodeId,
	highmem: bool,
}

impl Page {
	pub const fn new(pfn: u64, node: NodeId, highmem: bool) -> Self {
		Self { pfn, node, highmem }
	}

	/// Frame number of the first base frame of the extent.
	pub const fn pfn(&self) -> u64 {
		self.pfn
	}

	/// Node the extent's physical memory belongs to.
	pub const fn node(&self) -> NodeId {
		self.node
	}

	/// Whether the extent lies in memory that is not permanently mapped.
	pub const fn is_highmem(&self) -> bool {
		self.highmem
	}
}

/// The guest's page allocator as seen by the balloon.
pub trait PageAllocator: Send {
	/// Allocates an extent of `2^order` frames without sleeping or retrying
	/// hard, preferably on the hinted node.
	///
	/// The returned extent may come from a different node than hinted. The
	/// balloon checks [`Page::node`] itself.
	fn alloc_pages(&mut self, hint: NodeHint, order: u32) -> Option<Page>;

	/// Returns an extent obtained from [`Self::alloc_pages`] without using it.
	fn free_pages(&mut self, page: Page, order: u32);

	/// Hands a repopulated extent to the allocator as new usable memory.
	fn release_reserved(&mut self, page: Page, order: u32);

	/// Overwrites the contents of an extent before it leaves the guest.
	fn scrub(&mut self, page: &Page, order: u32);
}

/// Converts a number of balloon pages into KiB.
pub const fn pages_to_kib(pages: u64, page_shift: u32) -> u64 {
	pages << (page_shift - 10)
}

/// Converts KiB into balloon pages, dropping partial pages.
pub const fn kib_to_pages(kib: u64, page_shift: u32) -> u64 {
	kib >> (page_shift - 10)
}
