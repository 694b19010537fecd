pub mod http_fetcher;
pub mod s3_adapter;
pub mod zip_archive;
