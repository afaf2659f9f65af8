//! Gas Sim - deterministic doubles for hit delivery
//!
//! Lets trackers run without a network: [`SimulatedHitSender`] records every
//! request and answers with a configured status or failure, and
//! [`FixedClock`] pins the `z` timestamp.

pub mod clock;
pub mod sender;

pub use clock::FixedClock;
pub use sender::{RecordedRequest, ResponseConfig, SimulatedHitSender};
