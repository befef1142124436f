use crate::error::HotplugError;
use crate::mm::NodeId;

/// Memory hotplug of the guest kernel.
///
/// A successful [`add_memory`](Self::add_memory) only reserves the physical
/// range. The pages arrive later, one by one, through
/// [`Balloon::online_page`](crate::Balloon::online_page) once the kernel
/// brings the new memory online.
pub trait Hotplug: Send {
	fn add_memory(&mut self, node: NodeId, nr_pages: u64) -> Result<(), HotplugError>;
}
