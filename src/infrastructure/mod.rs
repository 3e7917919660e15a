pub mod storage;
pub mod workspace;
