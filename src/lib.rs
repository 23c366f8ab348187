//! gridquery - paged table queries over remote sources
//!
//! A table asks for a page of rows (pagination, multi-key sort, global
//! search, per-field filters) without knowing whether the source can run
//! the query itself or only hands out its whole dataset. Both paths return
//! the same `PagedResult`.

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod normalize;
pub mod observability;
pub mod query;
pub mod row;
pub mod session;
