pub mod config;
pub mod management;
pub mod storage;
