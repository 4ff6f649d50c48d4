//! Bucket state machines.
//!
//! Each core owns its mutable state behind a `std::sync::Mutex`; every
//! read-modify-write happens inside one critical section and re-checks the
//! bucket's bound invariant before the lock is released.
//!
//! # Available Algorithms
//!
//! - **[`TokenBucketCore`]** - Capped pool of permits refilled every tick; allows bursts
//! - **[`LeakyBucketCore`]** - Capped FIFO queue drained at a fixed rate; smooths output
//!
//! # Algorithm Comparison
//!
//! | Algorithm | Starts | Admission decided | Forward decided | Burst Handling |
//! |-----------|--------|-------------------|-----------------|----------------|
//! | Token Bucket | Full | On arrival | On arrival | Up to capacity |
//! | Leaky Bucket | Empty | On arrival | On drain tick | Queued, then paced |

pub mod token_bucket_core;
pub use token_bucket_core::TokenBucketCore;
pub use token_bucket_core::TokenBucketCoreConfig;

pub mod leaky_bucket_core;
pub use leaky_bucket_core::Admission;
pub use leaky_bucket_core::LeakyBucketCore;
pub use leaky_bucket_core::LeakyBucketCoreConfig;
