pub mod config;
pub mod corrections;
pub mod debug_log;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod throttle;

#[cfg(test)]
mod testing;
