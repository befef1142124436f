//! A module containing the balloon driver, the store it is steered through
//! and the common driver trait.

pub mod balloon;
pub mod store;

/// A trait to determine general driver information
pub trait Driver {
	/// Returns the device driver name
	fn get_name(&self) -> &'static str;
}
