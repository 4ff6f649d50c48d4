//! Unsigned integer type aliases for bucket capacities, rates and request ids.
//!
//! The concrete width is chosen at compile time via feature flags.
//!
//! # Features
//! - `tick-u64` (default): uses [`u64`] as `Uint`
//! - `tick-u128`: uses [`u128`] as `Uint` (build with `--no-default-features`)
//! - If neither feature is enabled, `u64` is used.

#[cfg(all(feature = "tick-u64", feature = "tick-u128"))]
compile_error!("You cannot enable both `tick-u64` and `tick-u128` features at the same time");

/// Alias for the unsigned integer type used for capacities, rates and counters.
#[cfg(all(feature = "tick-u64", not(feature = "tick-u128")))]
pub type Uint = u64;

/// Alias for the unsigned integer type used for capacities, rates and counters.
#[cfg(all(feature = "tick-u128", not(feature = "tick-u64")))]
pub type Uint = u128;

/// Alias for the unsigned integer type used for capacities, rates and counters.
#[cfg(not(any(feature = "tick-u64", feature = "tick-u128")))]
pub type Uint = u64;

/// Identifier of a synthetic request.
///
/// Assigned at arrival time, starting at 0 and increasing by one per request
/// within a single simulation run.
pub type RequestId = Uint;
