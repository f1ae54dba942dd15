pub mod client;
pub mod load;

pub use client::{Probe, ShopApiClient};
pub use load::{LoadEvent, LoadRunner, SCHEDULER_TICK};
