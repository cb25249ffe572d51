pub mod cache;
pub mod diag;
pub mod drive;
pub mod error;
pub mod path;
pub mod search;
pub mod storage;
