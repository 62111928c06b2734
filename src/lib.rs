#![allow(async_fn_in_trait)]
pub mod catalog;
pub mod copernicus;
pub mod download;
pub mod error;
pub mod naming;
pub mod s3;
pub mod selection;
pub mod table;
