pub mod catalog;
pub mod fetcher;
pub mod pipeline;
pub mod publisher;
pub mod storage;
pub mod transcoder;
