pub mod error;
pub mod heap;
pub mod macros;
pub mod medianfinder;
pub mod processor;
pub mod stop;

pub use error::StreamError;
pub use medianfinder::{MedianFinder, RunningMedian, Sample, SharedMedianFinder};
pub use processor::process;
pub use stop::StopSignal;
