//! NUMA-aware memory balloon.
//!
//! The balloon keeps the number of pages the hypervisor backs for each node
//! equal to that node's target. Surplus pages are allocated from the guest,
//! handed back to the hypervisor and parked in the node's pool. Missing pages
//! are repopulated from the pool, or requested through memory hotplug once
//! the pool is empty.
//!
//! All bookkeeping is protected by one balloon mutex that is held for a
//! single reconciliation step at a time. Steps are bounded by the batch size,
//! so target updates and the allocation API never wait long for the lock.

pub mod attr;
pub mod hotplug;
pub mod hypercall;
pub mod stats;
pub mod topology;
pub mod watch;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::future;
use core::sync::atomic::{self, AtomicBool};
use core::task::{Context, Poll, Waker};
use core::time::Duration;

use align_address::Align;
use async_lock::Mutex as AsyncMutex;
use hermit_sync::InterruptTicketMutex;
use smallvec::SmallVec;

use self::hotplug::Hotplug;
use self::hypercall::{MemoryOp, MigrationTarget, RangeMigration};
use self::stats::{ReconciliationState, ReservationStats};
use self::topology::{TopologyChangeSignal, TopologyCoordinator};
use self::watch::TargetWatcher;
use crate::config::{BalloonConfig, FRAME_LIST_LEN, RetryLimit};
use crate::drivers::Driver;
use crate::drivers::store::{NUMA_TOPO_CHANGE, Transport};
use crate::error::{BalloonError, ConfigError};
use crate::executor::{WorkSignal, yield_now};
use crate::mm::pool::{PageExtentPool, ParkedPage};
use crate::mm::{NodeHint, NodeId, Page, PageAllocator, pages_to_kib};
use crate::numa::{NodeLayout, NodeStrategy, TopologySnapshot};
use crate::time::Clock;

/// Everything the balloon talks to.
pub struct Collaborators {
	pub memory_op: Box<dyn MemoryOp>,
	pub allocator: Box<dyn PageAllocator>,
	/// `None` if the kernel cannot hotplug memory.
	pub hotplug: Option<Box<dyn Hotplug>>,
	pub transport: Arc<dyn Transport>,
	pub clock: Arc<dyn Clock>,
}

/// What the worker should do after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
	/// Sleep until the next external wakeup.
	Idle,
	/// Run another pass after the given delay, unless woken earlier.
	RetryAfter(Duration),
}

/// Direction a node was ballooned in during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum NodeAction {
	#[default]
	None,
	Increase,
	Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wakeup {
	Kicked,
	Timer,
	Shutdown,
}

/// State protected by the balloon mutex.
pub(crate) struct BalloonState {
	nodes: Vec<ReservationStats>,
	pools: Vec<PageExtentPool>,
	/// Staging buffer for the frames of one request.
	frame_list: heapless::Vec<u64, FRAME_LIST_LEN>,
	memory_op: Box<dyn MemoryOp>,
	allocator: Box<dyn PageAllocator>,
}

impl BalloonState {
	/// Guest-wide sums of all nodes. The backoff fields show the worst node.
	fn aggregate(&self) -> ReservationStats {
		let mut total = self.nodes[0].clone();

		for stats in &self.nodes[1..] {
			total.current_pages += stats.current_pages;
			total.target_pages += stats.target_pages;
			total.balloon_low += stats.balloon_low;
			total.balloon_high += stats.balloon_high;
			total.total_pages += stats.total_pages;
			total.target_unpopulated += stats.target_unpopulated;
			total.lent_pages += stats.lent_pages;
			total.hotplug_pending += stats.hotplug_pending;
			total.schedule_delay = total.schedule_delay.max(stats.schedule_delay);
			total.retry_count = total.retry_count.max(stats.retry_count);
			total.max_schedule_delay = total.max_schedule_delay.max(stats.max_schedule_delay);
			total.max_retry_count = match (total.max_retry_count, stats.max_retry_count) {
				(RetryLimit::Limited(a), RetryLimit::Limited(b)) => RetryLimit::Limited(a.max(b)),
				_ => RetryLimit::Unlimited,
			};
		}

		total
	}

	fn park(&mut self, node: NodeId, page: Page, order: u32) {
		let stats = &mut self.nodes[node.index()];
		if page.is_highmem() {
			stats.balloon_high += 1;
		} else {
			stats.balloon_low += 1;
		}

		self.pools[node.index()].append(page, order);
	}

	fn unpark(&mut self, node: NodeId, require_low: bool) -> Option<ParkedPage> {
		let parked = self.pools[node.index()].retrieve(require_low)?;

		let stats = &mut self.nodes[node.index()];
		if parked.page.is_highmem() {
			stats.balloon_high -= 1;
		} else {
			stats.balloon_low -= 1;
		}

		Some(parked)
	}

	/// Takes a low-memory page out of the pool for a borrower.
	fn lend(&mut self, node: NodeId) -> Option<Page> {
		let parked = self.unpark(node, true)?;
		let stats = &mut self.nodes[node.index()];
		stats.total_pages -= 1;
		stats.lent_pages += 1;
		Some(parked.page)
	}

	/// Repopulates up to `nr_pages` parked extents of `node`.
	fn increase_reservation(
		&mut self,
		node: NodeId,
		nr_pages: u64,
		layout: &NodeLayout,
		config: &BalloonConfig,
	) -> ReconciliationState {
		let nr_pages = nr_pages.min(config.batch_size as u64) as usize;
		let order = config.extent_order();

		self.frame_list.clear();
		for parked in self.pools[node.index()].iter().take(nr_pages) {
			if self.frame_list.push(parked.page.pfn()).is_err() {
				break;
			}
		}

		let rc = self.memory_op.increase_reservation(
			&self.frame_list,
			order,
			layout.alloc_hint(node),
			layout.reservation_flags(),
		);
		if rc <= 0 {
			debug!(
				"<balloon> Node {node}: hypervisor populated none of {} extents ({rc})",
				self.frame_list.len()
			);
			return ReconciliationState::RetryableError;
		}

		let mut populated = rc as usize;
		if populated > self.frame_list.len() {
			warn!(
				"<balloon> Node {node}: hypervisor reports {populated} populated extents of a batch of {}",
				self.frame_list.len()
			);
			populated = self.frame_list.len();
		}

		for _ in 0..populated {
			let parked = self
				.unpark(node, false)
				.expect("Populated extents must still be parked");
			self.allocator.release_reserved(parked.page, parked.order);
		}

		self.nodes[node.index()].current_pages += populated as u64;
		trace!("<balloon> Node {node}: repopulated {populated} extents");

		ReconciliationState::Done
	}

	/// Hands up to `nr_pages` extents of `node` back to the hypervisor.
	fn decrease_reservation(
		&mut self,
		node: NodeId,
		nr_pages: u64,
		hint: NodeHint,
		config: &BalloonConfig,
	) -> ReconciliationState {
		let nr_pages = nr_pages.min(config.batch_size as u64) as usize;
		let order = config.extent_order();
		let mut state = ReconciliationState::Done;

		let mut pages = Vec::with_capacity(nr_pages);
		for _ in 0..nr_pages {
			let Some(page) = self.allocator.alloc_pages(hint, order) else {
				debug!(
					"<balloon> Node {node}: allocator ran dry after {} extents",
					pages.len()
				);
				state = ReconciliationState::RetryableError;
				break;
			};

			if hint.node().is_some_and(|wanted| page.node() != wanted) {
				warn!(
					"<balloon> Node {node}: allocator returned an extent of node {}",
					page.node()
				);
				self.allocator.free_pages(page, order);
				state = ReconciliationState::RetryableError;
				break;
			}

			pages.push(page);
		}

		if pages.is_empty() {
			return state;
		}

		#[cfg(feature = "scrub-pages")]
		for page in &pages {
			self.allocator.scrub(page, order);
		}

		self.frame_list.clear();
		self.frame_list.extend(pages.iter().map(Page::pfn));

		let rc = self
			.memory_op
			.decrease_reservation(&self.frame_list, order, hint);
		assert_eq!(
			rc,
			pages.len() as i64,
			"<balloon> Hypervisor released {rc} of {} extents of node {node}",
			pages.len()
		);

		let released = pages.len() as u64;
		for page in pages {
			self.park(node, page, order);
		}
		self.nodes[node.index()].current_pages -= released;
		trace!("<balloon> Node {node}: released {released} extents");

		state
	}

	/// Feeds `result` into the backoff of `node`.
	fn schedule(&mut self, node: NodeId, result: ReconciliationState) -> ReconciliationState {
		let stats = &mut self.nodes[node.index()];
		let state = stats.update_schedule(result);

		if state == ReconciliationState::Canceled {
			warn!(
				"<balloon> Node {node}: giving up, clamping target of {} pages to {} pages",
				stats.target_pages, stats.current_pages
			);
			stats.target_pages = stats.current_pages;
		}

		debug_assert!(
			stats.is_consistent(),
			"<balloon> Node {node}: inconsistent bookkeeping {stats:?}"
		);

		state
	}
}

/// The balloon of one guest.
pub struct Balloon {
	config: BalloonConfig,
	layout: NodeLayout,
	/// The balloon mutex.
	state: InterruptTicketMutex<BalloonState>,
	/// Only one hotplug request is in flight at a time.
	hotplug: Option<AsyncMutex<Box<dyn Hotplug>>>,
	transport: Arc<dyn Transport>,
	clock: Arc<dyn Clock>,
	topology: TopologyCoordinator,
	watcher: TargetWatcher,
	work: WorkSignal,
	shutdown: AtomicBool,
}

impl Balloon {
	/// Creates the balloon with every node at its present memory.
	pub fn new(
		config: BalloonConfig,
		snapshot: &TopologySnapshot,
		collaborators: Collaborators,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let layout = NodeLayout::from_snapshot(snapshot);
		let frames_per_page = 1u64 << config.extent_order();
		let nodes = layout
			.node_ids()
			.map(|node| {
				let present = layout.memory(node).present_pages.div_ceil(frames_per_page);
				ReservationStats::new(present, &config)
			})
			.collect();
		let pools = layout.node_ids().map(|_| PageExtentPool::new()).collect();

		let hotplug = match collaborators.hotplug {
			Some(hotplug) if config.hotplug => Some(AsyncMutex::new(hotplug)),
			Some(_) => {
				info!("<balloon> Memory hotplug is disabled by configuration");
				None
			}
			None => None,
		};

		let topology = TopologyCoordinator::new(layout.num_nodes());

		Ok(Self {
			state: InterruptTicketMutex::new(BalloonState {
				nodes,
				pools,
				frame_list: heapless::Vec::new(),
				memory_op: collaborators.memory_op,
				allocator: collaborators.allocator,
			}),
			config,
			layout,
			hotplug,
			transport: collaborators.transport,
			clock: collaborators.clock,
			topology,
			watcher: TargetWatcher::new(),
			work: WorkSignal::new(),
			shutdown: AtomicBool::new(false),
		})
	}

	pub fn config(&self) -> &BalloonConfig {
		&self.config
	}

	pub fn layout(&self) -> &NodeLayout {
		&self.layout
	}

	pub fn num_nodes(&self) -> usize {
		self.layout.num_nodes()
	}

	pub fn topology(&self) -> &TopologyCoordinator {
		&self.topology
	}

	pub fn watcher(&self) -> &TargetWatcher {
		&self.watcher
	}

	pub(crate) fn transport(&self) -> &dyn Transport {
		self.transport.as_ref()
	}

	/// Snapshot of the bookkeeping of `node`.
	pub fn node_stats(&self, node: NodeId) -> Option<ReservationStats> {
		self.state.lock().nodes.get(node.index()).cloned()
	}

	/// Snapshot of the guest-wide bookkeeping.
	pub fn stats(&self) -> ReservationStats {
		self.state.lock().aggregate()
	}

	/// Number of extents parked in the pool of `node`.
	pub fn num_parked(&self, node: NodeId) -> usize {
		self.state
			.lock()
			.pools
			.get(node.index())
			.map_or(0, PageExtentPool::len)
	}

	fn credit(&self, node: NodeId) -> i64 {
		self.state.lock().nodes[node.index()].credit()
	}

	/// Wakes the worker.
	pub fn wake(&self) {
		self.work.notify();
	}

	/// Sets the target of `node`, or splits a guest-wide target evenly
	/// across all nodes if `node` is `None`.
	pub fn set_new_target(&self, target_pages: u64, node: Option<NodeId>) -> Result<(), BalloonError> {
		{
			let mut state = self.state.lock();
			match node {
				None => {
					let mut targets: SmallVec<[u64; 8]> = SmallVec::from_elem(0, self.num_nodes());
					self.layout.split_target(target_pages, &mut targets);
					for (stats, target) in state.nodes.iter_mut().zip(targets) {
						stats.target_pages = target;
					}
				}
				Some(node) => {
					let num_nodes = state.nodes.len();
					let stats = state
						.nodes
						.get_mut(node.index())
						.ok_or(BalloonError::InvalidNode { node, num_nodes })?;
					stats.target_pages = target_pages;
				}
			}
		}

		match node {
			None => debug!("<balloon> New target of {target_pages} pages"),
			Some(node) => debug!("<balloon> New target of {target_pages} pages for node {node}"),
		}

		self.wake();
		Ok(())
	}

	/// Runs one reconciliation pass over all nodes.
	pub async fn process(&self) -> PassOutcome {
		let signal = self.topology.signal();
		if signal == TopologyChangeSignal::NodesRemoved {
			self.fence_shrinking_nodes().await;
		}

		let mut actions: SmallVec<[NodeAction; 8]> =
			SmallVec::from_elem(NodeAction::None, self.num_nodes());
		let mut retry_node = None;

		for node in self.layout.node_ids() {
			if signal != TopologyChangeSignal::None && self.credit(node) > 0 {
				self.migrate(node, MigrationTarget::Node(node));
			}

			let (state, action) = self.balance_node(node).await;
			actions[node.index()] = action;

			if state == ReconciliationState::RetryableError && retry_node.is_none() {
				retry_node = Some(node);
			}
		}

		if signal == TopologyChangeSignal::NodesRemoved {
			self.topology.unfence_all();
		}

		if let Some(node) = retry_node {
			let delay = self.state.lock().nodes[node.index()].schedule_delay;
			debug!("<balloon> Node {node} failed, retrying in {delay} s");
			return PassOutcome::RetryAfter(Duration::from_secs(delay.into()));
		}

		if signal != TopologyChangeSignal::None {
			self.finish_topology_change(signal, &actions);
		}

		PassOutcome::Idle
	}

	/// Reconciles `node` until it reaches its target or a step fails.
	async fn balance_node(&self, node: NodeId) -> (ReconciliationState, NodeAction) {
		let mut action = NodeAction::None;

		loop {
			let (credit, finished) = {
				let mut state = self.state.lock();
				let credit = state.nodes[node.index()].credit();
				let result = match credit.cmp(&0) {
					Ordering::Equal => Some(ReconciliationState::Done),
					Ordering::Greater if state.nodes[node.index()].is_inflated() => {
						Some(state.increase_reservation(
							node,
							credit.unsigned_abs(),
							&self.layout,
							&self.config,
						))
					}
					Ordering::Greater => None,
					Ordering::Less => Some(state.decrease_reservation(
						node,
						credit.unsigned_abs(),
						self.layout.alloc_hint(node),
						&self.config,
					)),
				};

				(credit, result.map(|result| state.schedule(node, result)))
			};

			match credit.cmp(&0) {
				Ordering::Greater => action = NodeAction::Increase,
				Ordering::Less => action = NodeAction::Decrease,
				Ordering::Equal => {}
			}

			let state = match finished {
				Some(state) => state,
				None => {
					let result = self.reserve_additional_memory(node).await;
					self.state.lock().schedule(node, result)
				}
			};

			if credit == 0 || state != ReconciliationState::Done {
				return (state, action);
			}

			yield_now().await;
		}
	}

	/// Requests the memory `node` is missing through hotplug.
	///
	/// Must be called without holding the balloon mutex, since onlining the
	/// new memory takes it.
	async fn reserve_additional_memory(&self, node: NodeId) -> ReconciliationState {
		let Some(hotplug) = &self.hotplug else {
			debug!("<balloon> Node {node}: no parked pages left and hotplug is unavailable");
			return ReconciliationState::RetryableError;
		};

		let nr_pages = {
			let mut state = self.state.lock();
			let stats = &mut state.nodes[node.index()];
			let credit = stats.hotplug_credit();
			if credit <= 0 {
				return ReconciliationState::Wait;
			}

			let nr_pages = credit
				.unsigned_abs()
				.align_up(self.config.pages_per_section());
			// Pages may come online before add_memory returns.
			stats.hotplug_pending += nr_pages;
			nr_pages
		};

		info!("<balloon> Node {node}: hotplugging {nr_pages} pages");
		let result = hotplug.lock().await.add_memory(node, nr_pages);

		match result {
			Ok(()) => ReconciliationState::Wait,
			Err(err) => {
				warn!("<balloon> Node {node}: hotplug of {nr_pages} pages failed: {err}");
				let mut state = self.state.lock();
				let stats = &mut state.nodes[node.index()];
				stats.hotplug_pending = stats.hotplug_pending.saturating_sub(nr_pages);
				ReconciliationState::RetryableError
			}
		}
	}

	/// Adds a page of hotplugged memory that just came online.
	pub fn online_page(&self, page: Page) {
		let node = if page.node().index() < self.num_nodes() {
			page.node()
		} else {
			NodeId::new(0)
		};

		{
			let mut state = self.state.lock();
			state.park(node, page, self.config.extent_order());
			let stats = &mut state.nodes[node.index()];
			stats.total_pages += 1;
			stats.hotplug_pending = stats.hotplug_pending.saturating_sub(1);
		}

		trace!("<balloon> Node {node}: page {:#x} came online", page.pfn());
		self.wake();
	}

	async fn fence_shrinking_nodes(&self) {
		let shrinking: SmallVec<[NodeId; 8]> = {
			let state = self.state.lock();
			self.layout
				.node_ids()
				.filter(|node| state.nodes[node.index()].credit() < 0)
				.collect()
		};

		let version = self.topology.bump_version();
		info!(
			"<balloon:topology> Nodes are being removed (version {version}), fencing nodes {shrinking:?}"
		);

		for node in &shrinking {
			self.topology.fence(*node);
		}

		self.topology.drained().await;
	}

	fn migrate(&self, node: NodeId, move_to: MigrationTarget) {
		let Some(range) = self.layout.migration_range(node) else {
			return;
		};

		let migration = RangeMigration {
			start_pfn: range.start_pfn,
			end_pfn: range.end_pfn(),
			move_to,
		};

		let result = self.state.lock().memory_op.migrate_page_range(&migration);
		match result {
			Ok(()) => debug!("<balloon:topology> Migrated node {node}: {migration:?}"),
			Err(err) => warn!("<balloon:topology> Migration of node {node} failed: {err}"),
		}
	}

	fn finish_topology_change(&self, signal: TopologyChangeSignal, actions: &[NodeAction]) {
		for node in self.layout.node_ids() {
			if actions[node.index()] == NodeAction::Decrease {
				self.migrate(node, MigrationTarget::Unspecified);
			}
		}

		if let Err(err) = self.transport.write(NUMA_TOPO_CHANGE, 0) {
			error!("<balloon:topology> Unable to acknowledge topology change: {err}");
			return;
		}

		self.topology.acknowledge(signal);

		let version = self.topology.bump_version();
		info!("<balloon:topology> Topology change {signal:?} completed, version {version}");
	}

	/// Lends `nr_pages` pages without backing to the caller.
	///
	/// Pages are taken from the pool of node 0 first. If that is empty, the
	/// pool is refilled either through hotplug or by shrinking the
	/// reservation.
	pub async fn alloc_ballooned_pages(&self, nr_pages: usize) -> Result<Vec<Page>, BalloonError> {
		if self.is_shut_down() {
			return Err(BalloonError::ShutDown);
		}

		let node = NodeId::new(0);
		self.state.lock().nodes[node.index()].target_unpopulated += nr_pages as u64;

		let mut pages = Vec::with_capacity(nr_pages);
		while pages.len() < nr_pages {
			let parked = self.state.lock().lend(node);
			if let Some(page) = parked {
				pages.push(page);
				continue;
			}

			if let Err(err) = self.add_ballooned_pages(nr_pages - pages.len()).await {
				warn!(
					"<balloon> Unable to lend {nr_pages} pages, got {}: {err}",
					pages.len()
				);
				{
					let mut state = self.state.lock();
					let stats = &mut state.nodes[node.index()];
					stats.target_unpopulated = stats
						.target_unpopulated
						.saturating_sub((nr_pages - pages.len()) as u64);
				}
				self.free_ballooned_pages(pages);
				return Err(err);
			}
		}

		Ok(pages)
	}

	async fn add_ballooned_pages(&self, nr_pages: usize) -> Result<(), BalloonError> {
		let node = NodeId::new(0);

		if self.config.hotplug_unpopulated
			&& self.reserve_additional_memory(node).await == ReconciliationState::Wait
		{
			future::poll_fn(|cx| {
				let mut state = self.state.lock();
				let pool = &mut state.pools[node.index()];
				if pool.is_empty() {
					pool.register_waiter(cx.waker());
					Poll::Pending
				} else {
					Poll::Ready(())
				}
			})
			.await;
			return Ok(());
		}

		let state = self.state.lock().decrease_reservation(
			node,
			nr_pages as u64,
			NodeHint::Any,
			&self.config,
		);

		if state == ReconciliationState::Done {
			Ok(())
		} else {
			Err(BalloonError::OutOfMemory)
		}
	}

	/// Takes back pages lent by [`Self::alloc_ballooned_pages`].
	pub fn free_ballooned_pages(&self, pages: Vec<Page>) {
		let node = NodeId::new(0);
		let order = self.config.extent_order();

		let credit = {
			let mut state = self.state.lock();
			let nr_pages = pages.len() as u64;
			for page in pages {
				state.park(node, page, order);
			}

			let stats = &mut state.nodes[node.index()];
			stats.total_pages += nr_pages;
			stats.lent_pages = stats.lent_pages.saturating_sub(nr_pages);
			stats.target_unpopulated = stats.target_unpopulated.saturating_sub(nr_pages);
			stats.credit()
		};

		if credit != 0 {
			self.wake();
		}
	}

	/// Stops the worker after its current pass.
	///
	/// Parked pages stay in the pools.
	pub fn shutdown(&self) {
		self.shutdown.store(true, atomic::Ordering::Release);
		self.wake();
	}

	pub fn is_shut_down(&self) -> bool {
		self.shutdown.load(atomic::Ordering::Acquire)
	}

	/// Waits for a kick, shutdown or the retry `deadline`.
	///
	/// `timer` remembers the last armed deadline so a task that is polled
	/// repeatedly arms the clock only once per deadline and waker.
	pub(crate) fn poll_wakeup(
		&self,
		cx: &mut Context<'_>,
		deadline: Option<Duration>,
		timer: &mut Option<(Duration, Waker)>,
	) -> Poll<Wakeup> {
		if self.is_shut_down() {
			return Poll::Ready(Wakeup::Shutdown);
		}

		if self.work.take() {
			return Poll::Ready(Wakeup::Kicked);
		}

		if let Some(deadline) = deadline {
			if self.clock.now() >= deadline {
				return Poll::Ready(Wakeup::Timer);
			}
			let armed = matches!(
				timer,
				Some((at, waker)) if *at == deadline && waker.will_wake(cx.waker())
			);
			if !armed {
				self.clock.wake_at(deadline, cx.waker());
				*timer = Some((deadline, cx.waker().clone()));
			}
		}

		self.work.register(cx.waker());

		if self.work.take() {
			Poll::Ready(Wakeup::Kicked)
		} else {
			Poll::Pending
		}
	}

	pub(crate) fn now(&self) -> Duration {
		self.clock.now()
	}

	pub fn print_information(&self) {
		let page_kib = pages_to_kib(1, self.config.page_shift);
		let (stats, nodes) = {
			let state = self.state.lock();
			(state.aggregate(), state.nodes.clone())
		};

		infoheader!(" BALLOON INFORMATION ");
		infoentry!("Driver", self.get_name());
		infoentry!(
			"Layout",
			if self.layout.is_numa() {
				"virtual NUMA"
			} else {
				"single node"
			}
		);
		infoentry!("Nodes", self.num_nodes());
		infoentry!("Page size", "{page_kib} KiB");
		infoentry!("Batch size", self.config.batch_size);
		infoentry!(
			"Hotplug",
			if self.hotplug.is_some() {
				"enabled"
			} else {
				"disabled"
			}
		);
		infoentry!("Current memory", "{} KiB", stats.current_pages * page_kib);
		infoentry!("Target memory", "{} KiB", stats.target_pages * page_kib);
		for (node, stats) in nodes.iter().enumerate() {
			infoentry!(
				"Node",
				"{node}: {} KiB current, {} KiB target",
				stats.current_pages * page_kib,
				stats.target_pages * page_kib
			);
		}
		infofooter!();
	}
}

impl Driver for Balloon {
	fn get_name(&self) -> &'static str {
		"numa-balloon"
	}
}
