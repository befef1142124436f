//! A NUMA-aware memory balloon for paravirtualized guests.
//!
//! The balloon keeps the amount of memory a guest holds equal to a target
//! dictated by the hypervisor. Every virtual NUMA node is reconciled on its
//! own: surplus extents are handed back to the hypervisor and parked in the
//! node's pool, and parked extents are repopulated when the target grows.
//! When the pool runs dry, fresh memory can be requested through hotplug.
//!
//! The engine is embedded through a small set of collaborator traits
//! ([`MemoryOp`], [`PageAllocator`], [`Hotplug`], [`Transport`] and
//! [`Clock`]) and driven by [`balloon_run`], which is an ordinary future that
//! any executor can poll. Retry delays are armed as timers on the [`Clock`],
//! so the worker is woken when they expire.
//!
//! ## Feature flags
#![cfg_attr(feature = "document-features", doc = document_features::document_features!())]
#![no_std]
#![allow(clippy::tabs_in_doc_comments)]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;
#[cfg(all(test, not(target_os = "none")))]
extern crate std;

#[macro_use]
mod logging;

pub mod config;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod mm;
pub mod numa;
pub mod time;

pub use crate::config::{BalloonConfig, RetryLimit};
pub use crate::drivers::balloon::hotplug::Hotplug;
pub use crate::drivers::balloon::hypercall::{
	MemoryOp, MigrationTarget, RangeMigration, ReservationFlags,
};
pub use crate::drivers::balloon::{Balloon, Collaborators, PassOutcome};
pub use crate::drivers::store::Transport;
pub use crate::error::BalloonError;
pub use crate::executor::balloon::{balloon_run, init as init_balloon};
pub use crate::logging::{LogSink, init as init_logging};
pub use crate::mm::{NodeHint, NodeId, Page, PageAllocator};
pub use crate::numa::{NodeMemory, TopologySnapshot};
pub use crate::time::Clock;
