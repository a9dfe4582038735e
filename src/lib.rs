pub mod config;
pub mod event;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod transform;
