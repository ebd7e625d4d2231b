#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestration for Breach Defence.
//!
//! [`Simulation`] wires the world and the pure systems together and executes
//! one tick at a time in a fixed order. [`Clock`] drives a simulation on a
//! dedicated thread at a fixed interval and forwards player commands to it
//! between ticks.

mod clock;
mod simulation;

pub use clock::{Clock, ClockError, ClockHandle, CommandError};
pub use simulation::{Simulation, SimulationObserver, TickReport};
