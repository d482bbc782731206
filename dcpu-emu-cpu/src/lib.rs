pub mod cpu;
pub mod executor;
