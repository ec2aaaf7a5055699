pub mod config;
pub mod logging;

pub mod engine;
pub mod error;
pub mod events;
pub mod fetch;
pub mod id;
pub mod naming;
pub mod probe;
pub mod progress;
pub mod registry;
pub mod segmenter;
