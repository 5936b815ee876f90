pub mod aggregate;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod project;
pub mod runner;
pub mod storage;
pub mod wizard;
