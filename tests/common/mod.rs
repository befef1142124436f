//! Fake collaborators shared by the integration tests.
//!
//! Every fake keeps its state behind an `Arc<Mutex<_>>` so a test can inspect
//! and steer it while the balloon owns the fake itself.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Waker;
use std::time::Duration;

use numa_balloon::drivers::store::{Transport, WatchCallback};
use numa_balloon::error::{HotplugError, MigrationError, TransportError};
use numa_balloon::{
	Balloon, BalloonConfig, Clock, Collaborators, Hotplug, MemoryOp, NodeHint, NodeId, NodeMemory,
	Page, PageAllocator, RangeMigration, ReservationFlags, TopologySnapshot,
};

/// Frames of node `i` start at `i * NODE_STRIDE`.
pub const NODE_STRIDE: u64 = 0x10_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
	Increase {
		frames: Vec<u64>,
		order: u32,
		node: NodeHint,
		flags: ReservationFlags,
	},
	Decrease {
		frames: Vec<u64>,
		order: u32,
		node: NodeHint,
	},
	Migrate(RangeMigration),
}

#[derive(Debug, Default)]
pub struct MemoryState {
	pub events: Vec<MemoryEvent>,
	/// Caps the number of extents an increase backs. Non-positive values
	/// are returned as is.
	pub increase_limit: Option<i64>,
	/// Overrides the result of every increase, taking precedence over the limit.
	pub increase_result: Option<i64>,
	/// Overrides the result of every decrease.
	pub decrease_result: Option<i64>,
	pub migration_fails: bool,
}

impl MemoryState {
	pub fn increases(&self) -> Vec<&MemoryEvent> {
		self.events
			.iter()
			.filter(|event| matches!(event, MemoryEvent::Increase { .. }))
			.collect()
	}

	pub fn decreases(&self) -> Vec<&MemoryEvent> {
		self.events
			.iter()
			.filter(|event| matches!(event, MemoryEvent::Decrease { .. }))
			.collect()
	}

	pub fn migrations(&self) -> Vec<RangeMigration> {
		self.events
			.iter()
			.filter_map(|event| match event {
				MemoryEvent::Migrate(migration) => Some(*migration),
				_ => None,
			})
			.collect()
	}
}

pub struct FakeMemoryOp(pub Arc<Mutex<MemoryState>>);

impl MemoryOp for FakeMemoryOp {
	fn increase_reservation(
		&mut self,
		frames: &[u64],
		order: u32,
		node: NodeHint,
		flags: ReservationFlags,
	) -> i64 {
		let mut state = self.0.lock().unwrap();
		state.events.push(MemoryEvent::Increase {
			frames: frames.to_vec(),
			order,
			node,
			flags,
		});

		let len = frames.len() as i64;
		if let Some(result) = state.increase_result {
			return result;
		}
		match state.increase_limit {
			Some(limit) if limit <= 0 => limit,
			Some(limit) => limit.min(len),
			None => len,
		}
	}

	fn decrease_reservation(&mut self, frames: &[u64], order: u32, node: NodeHint) -> i64 {
		let mut state = self.0.lock().unwrap();
		state.events.push(MemoryEvent::Decrease {
			frames: frames.to_vec(),
			order,
			node,
		});

		state.decrease_result.unwrap_or(frames.len() as i64)
	}

	fn migrate_page_range(&mut self, migration: &RangeMigration) -> Result<(), MigrationError> {
		let mut state = self.0.lock().unwrap();
		state.events.push(MemoryEvent::Migrate(*migration));

		if state.migration_fails {
			Err(MigrationError::Failed(-22))
		} else {
			Ok(())
		}
	}
}

#[derive(Debug, Default)]
pub struct AllocatorState {
	/// Extents left per node. Nodes without an entry never run dry.
	pub capacity: HashMap<u32, u64>,
	/// After this many allocations, extents come from the given node.
	pub foreign: Option<(usize, NodeId)>,
	pub highmem: bool,
	pub allocated: usize,
	pub freed: Vec<Page>,
	pub released: Vec<Page>,
	pub scrubbed: Vec<u64>,
	next_pfn: HashMap<u32, u64>,
}

pub struct FakeAllocator(pub Arc<Mutex<AllocatorState>>);

impl PageAllocator for FakeAllocator {
	fn alloc_pages(&mut self, hint: NodeHint, order: u32) -> Option<Page> {
		let mut state = self.0.lock().unwrap();
		let mut node = hint.node().unwrap_or_default();

		if let Some(left) = state.capacity.get_mut(&node.id()) {
			if *left == 0 {
				return None;
			}
			*left -= 1;
		}

		match state.foreign {
			Some((after, foreign)) if state.allocated >= after => node = foreign,
			_ => {}
		}
		state.allocated += 1;

		let next = state.next_pfn.entry(node.id()).or_insert(0);
		let pfn = u64::from(node.id()) * NODE_STRIDE + *next;
		*next += 1 << order;

		Some(Page::new(pfn, node, state.highmem))
	}

	fn free_pages(&mut self, page: Page, _order: u32) {
		self.0.lock().unwrap().freed.push(page);
	}

	fn release_reserved(&mut self, page: Page, _order: u32) {
		self.0.lock().unwrap().released.push(page);
	}

	fn scrub(&mut self, page: &Page, _order: u32) {
		self.0.lock().unwrap().scrubbed.push(page.pfn());
	}
}

#[derive(Debug, Default)]
pub struct HotplugState {
	pub requests: Vec<(NodeId, u64)>,
	pub fails: bool,
}

pub struct FakeHotplug(pub Arc<Mutex<HotplugState>>);

impl Hotplug for FakeHotplug {
	fn add_memory(&mut self, node: NodeId, nr_pages: u64) -> Result<(), HotplugError> {
		let mut state = self.0.lock().unwrap();
		state.requests.push((node, nr_pages));

		if state.fails {
			Err(HotplugError::NoAddressSpace)
		} else {
			Ok(())
		}
	}
}

/// In-memory store. Watches fire only through [`FakeTransport::fire`].
#[derive(Default)]
pub struct FakeTransport {
	values: Mutex<HashMap<String, u64>>,
	watches: Mutex<Vec<(String, Arc<dyn Fn(&str) + Send + Sync>)>>,
	pub writes: Mutex<Vec<(String, u64)>>,
	pub fail_writes: AtomicBool,
}

impl FakeTransport {
	pub fn set(&self, path: &str, value: u64) {
		self.values.lock().unwrap().insert(path.to_string(), value);
	}

	pub fn get(&self, path: &str) -> Option<u64> {
		self.values.lock().unwrap().get(path).copied()
	}

	/// Runs every watch registered on `path` or one of its parents.
	pub fn fire(&self, path: &str) {
		let callbacks: Vec<_> = self
			.watches
			.lock()
			.unwrap()
			.iter()
			.filter(|(watched, _)| {
				path == watched || path.starts_with(&format!("{watched}/"))
			})
			.map(|(_, callback)| callback.clone())
			.collect();

		for callback in callbacks {
			(*callback)(path);
		}
	}

	pub fn update(&self, path: &str, value: u64) {
		self.set(path, value);
		self.fire(path);
	}

	pub fn watched(&self) -> Vec<String> {
		self.watches
			.lock()
			.unwrap()
			.iter()
			.map(|(path, _)| path.clone())
			.collect()
	}
}

impl Transport for FakeTransport {
	fn read(&self, path: &str) -> Result<u64, TransportError> {
		self.get(path).ok_or(TransportError::NotFound)
	}

	fn write(&self, path: &str, value: u64) -> Result<(), TransportError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(TransportError::Unavailable);
		}

		self.writes.lock().unwrap().push((path.to_string(), value));
		self.set(path, value);
		Ok(())
	}

	fn watch(&self, path: &str, callback: WatchCallback) -> Result<(), TransportError> {
		self.watches
			.lock()
			.unwrap()
			.push((path.to_string(), Arc::from(callback)));
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct FakeClock {
	millis: AtomicU64,
	timers: Mutex<Vec<(Duration, Waker)>>,
}

impl FakeClock {
	/// Moves time forward and fires every timer that expired.
	pub fn advance(&self, by: Duration) {
		self.millis
			.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
		let now = self.now();

		let expired = {
			let mut timers = self.timers.lock().unwrap();
			let (expired, pending) = timers
				.drain(..)
				.partition::<Vec<_>, _>(|(deadline, _)| *deadline <= now);
			*timers = pending;
			expired
		};
		for (_, waker) in expired {
			waker.wake();
		}
	}

	pub fn armed_timers(&self) -> usize {
		self.timers.lock().unwrap().len()
	}
}

impl Clock for FakeClock {
	fn now(&self) -> Duration {
		Duration::from_millis(self.millis.load(Ordering::SeqCst))
	}

	fn wake_at(&self, deadline: Duration, waker: &Waker) {
		self.timers.lock().unwrap().push((deadline, waker.clone()));
	}
}

/// Balloon pages of one base frame, so extents and frames coincide.
pub fn test_config() -> BalloonConfig {
	BalloonConfig {
		page_shift: 12,
		..Default::default()
	}
}

/// One node per entry with the given number of present frames and one
/// vCPU per node.
pub fn topology(node_pages: &[u64]) -> TopologySnapshot {
	let nodes = node_pages
		.iter()
		.enumerate()
		.map(|(i, &pages)| NodeMemory {
			start_pfn: i as u64 * NODE_STRIDE,
			spanned_pages: pages,
			present_pages: pages,
		})
		.collect::<Vec<_>>();
	let vcpus = (0..node_pages.len() as u32).map(|vcpu| (vcpu, NodeId::new(vcpu)));

	TopologySnapshot::new(nodes, vcpus).unwrap()
}

pub struct Harness {
	pub balloon: Arc<Balloon>,
	pub memory: Arc<Mutex<MemoryState>>,
	pub allocator: Arc<Mutex<AllocatorState>>,
	pub hotplug: Arc<Mutex<HotplugState>>,
	pub transport: Arc<FakeTransport>,
	pub clock: Arc<FakeClock>,
}

impl Harness {
	pub fn new(config: BalloonConfig, node_pages: &[u64], with_hotplug: bool) -> Self {
		let memory = Arc::new(Mutex::new(MemoryState::default()));
		let allocator = Arc::new(Mutex::new(AllocatorState::default()));
		let hotplug = Arc::new(Mutex::new(HotplugState::default()));
		let transport = Arc::new(FakeTransport::default());
		let clock = Arc::new(FakeClock::default());

		let collaborators = Collaborators {
			memory_op: Box::new(FakeMemoryOp(memory.clone())),
			allocator: Box::new(FakeAllocator(allocator.clone())),
			hotplug: with_hotplug
				.then(|| Box::new(FakeHotplug(hotplug.clone())) as Box<dyn Hotplug>),
			transport: transport.clone(),
			clock: clock.clone(),
		};

		let balloon = Balloon::new(config, &topology(node_pages), collaborators).unwrap();

		Self {
			balloon: Arc::new(balloon),
			memory,
			allocator,
			hotplug,
			transport,
			clock,
		}
	}

	pub fn single(node_pages: u64) -> Self {
		Self::new(test_config(), &[node_pages], false)
	}

	/// Checks the bookkeeping invariant of every node.
	pub fn assert_consistent(&self) {
		for node in self.balloon.layout().node_ids() {
			let stats = self.balloon.node_stats(node).unwrap();
			assert!(stats.is_consistent(), "node {node}: {stats:?}");
			assert_eq!(
				self.balloon.num_parked(node) as u64,
				stats.ballooned_pages(),
				"node {node}: {stats:?}"
			);
		}
	}
}
