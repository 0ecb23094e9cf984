pub mod crypto;
pub mod log;
pub mod rng;
pub mod time;
