pub mod canonical;
pub mod contract;
pub mod error;
pub mod execution;
pub mod hasher;
pub mod invite;
pub mod notify;
pub mod service;
pub mod signature;
pub mod store;
pub mod utils;
