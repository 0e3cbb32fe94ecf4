pub mod deleter;
pub mod engine;
pub mod index;
pub mod materialize;
pub mod paths;
pub mod remote;
pub mod report;
pub mod resolver;
#[cfg(test)]
mod test_support;
pub mod transfer;
pub mod uploader;
