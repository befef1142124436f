//! Pools of extents whose backing frames are currently held by the hypervisor.

use alloc::collections::VecDeque;
use core::task::Waker;

use smallvec::SmallVec;

use super::Page;

/// An extent parked in a pool together with its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkedPage {
	pub page: Page,
	pub order: u32,
}

/// Per-node store of ballooned extents.
///
/// Extents in low memory are kept at the front and extents in high memory
/// at the back, so callers that need permanently mapped memory find it
/// first. Tasks waiting for the pool to refill register a waker that is
/// woken on the next [`append`](Self::append).
#[derive(Debug, Default)]
pub struct PageExtentPool {
	pages: VecDeque<ParkedPage>,
	waiters: SmallVec<[Waker; 2]>,
}

impl PageExtentPool {
	pub const fn new() -> Self {
		Self {
			pages: VecDeque::new(),
			waiters: SmallVec::new_const(),
		}
	}

	pub fn len(&self) -> usize {
		self.pages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pages.is_empty()
	}

	/// Parks `page` and wakes every task waiting for the pool.
	pub fn append(&mut self, page: Page, order: u32) {
		let parked = ParkedPage { page, order };
		if page.is_highmem() {
			self.pages.push_back(parked);
		} else {
			self.pages.push_front(parked);
		}

		for waker in self.waiters.drain(..) {
			waker.wake();
		}
	}

	/// Takes one extent out of the pool.
	///
	/// Low memory is always preferred. High memory is only handed out if
	/// `require_low` is not set.
	pub fn retrieve(&mut self, require_low: bool) -> Option<ParkedPage> {
		let front = self.pages.front()?;
		if require_low && front.page.is_highmem() {
			return None;
		}

		self.pages.pop_front()
	}

	/// The extent that [`retrieve(false)`](Self::retrieve) would return next.
	pub fn first(&self) -> Option<&ParkedPage> {
		self.pages.front()
	}

	/// The extent following `page` in retrieval order.
	pub fn next_after(&self, page: &Page) -> Option<&ParkedPage> {
		let position = self.pages.iter().position(|parked| parked.page == *page)?;
		self.pages.get(position + 1)
	}

	pub fn iter(&self) -> impl Iterator<Item = &ParkedPage> {
		self.pages.iter()
	}

	/// Registers `waker` to be woken when the next extent is parked.
	pub fn register_waiter(&mut self, waker: &Waker) {
		if !self.waiters.iter().any(|w| w.will_wake(waker)) {
			self.waiters.push(waker.clone());
		}
	}
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
	use alloc::sync::Arc;
	use alloc::task::Wake;
	use core::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::mm::NodeId;

	fn low(pfn: u64) -> Page {
		Page::new(pfn, NodeId::new(0), false)
	}

	fn high(pfn: u64) -> Page {
		Page::new(pfn, NodeId::new(0), true)
	}

	#[test]
	fn low_memory_is_preferred() {
		let mut pool = PageExtentPool::new();
		pool.append(high(1), 0);
		pool.append(low(2), 0);
		pool.append(high(3), 0);
		pool.append(low(4), 0);

		assert_eq!(pool.len(), 4);
		assert_eq!(pool.retrieve(false).unwrap().page, low(4));
		assert_eq!(pool.retrieve(true).unwrap().page, low(2));
		assert_eq!(pool.retrieve(true), None);
		assert_eq!(pool.retrieve(false).unwrap().page, high(1));
		assert_eq!(pool.retrieve(false).unwrap().page, high(3));
		assert!(pool.retrieve(false).is_none());
		assert!(pool.is_empty());
	}

	#[test]
	fn traversal_follows_retrieval_order() {
		let mut pool = PageExtentPool::new();
		pool.append(low(10), 9);
		pool.append(high(20), 9);
		pool.append(low(30), 9);

		let first = pool.first().unwrap().page;
		assert_eq!(first, low(30));
		let second = pool.next_after(&first).unwrap().page;
		assert_eq!(second, low(10));
		let third = pool.next_after(&second).unwrap().page;
		assert_eq!(third, high(20));
		assert!(pool.next_after(&third).is_none());
		assert!(pool.next_after(&low(99)).is_none());
		assert!(pool.iter().all(|parked| parked.order == 9));
	}

	struct CountingWaker(AtomicUsize);

	impl Wake for CountingWaker {
		fn wake(self: Arc<Self>) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[test]
	fn append_wakes_waiters_once() {
		let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
		let waker = Waker::from(counter.clone());

		let mut pool = PageExtentPool::new();
		pool.register_waiter(&waker);
		pool.register_waiter(&waker);
		pool.append(low(1), 0);
		pool.append(low(2), 0);

		assert_eq!(counter.0.load(Ordering::SeqCst), 1);
	}
}
