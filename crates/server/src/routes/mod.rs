pub mod batch;
pub mod gallery;
pub mod storage;
