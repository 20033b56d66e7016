pub mod batch_generator;
pub mod catalog;
pub mod gallery_generator;
pub mod gallery_repository;
pub mod image_api;
pub mod prompts;
pub mod rate_limiter;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
