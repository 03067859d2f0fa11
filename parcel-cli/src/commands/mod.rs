pub mod config;
pub mod datasets;
pub mod mounts;
