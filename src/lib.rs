pub mod config;
pub mod effects;
pub mod error;
pub mod executor;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod plan;
pub mod probe;
pub mod report;
pub mod scan;
pub mod transcode;

#[cfg(test)]
mod test_support;
