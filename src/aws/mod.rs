mod config;
mod s3;

pub use config::config;
pub use s3::S3Store;
