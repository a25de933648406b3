//! # Launchpad
//!
//! Backend of a privacy-preserving token launchpad. Contributors pledge
//! stablecoins to a project; each pledge is routed through a shielding pool
//! before it is recorded. When the raise is over, an administrator settles
//! every pending pledge in a single distribution batch.
//!
//! ## Architecture
//!
//! * [`launchpad`] is the façade the REST layer ([`api`]) talks to.
//! * [`contribution`] and [`distribution`] hold the two write flows.
//! * [`store`] and [`signer`] are the capabilities those flows consume;
//!   [`db`] and [`rpc`] are the shipped implementations.
//! * [`amount`] and [`allocation`] hold all monetary arithmetic.

pub mod allocation;
pub mod amount;
pub mod api;
pub mod clock;
pub mod config;
pub mod contribution;
pub mod db;
pub mod distribution;
pub mod errors;
pub mod launchpad;
pub mod rpc;
pub mod signer;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_distribute;

pub use errors::{LaunchpadError, Result};
pub use launchpad::{Launchpad, LaunchpadSettings};
