pub mod config;
pub mod functional;
pub mod toy_mem;
pub mod trace;
pub mod traffic;
