pub mod commands;
pub mod credentials;
pub mod error_utils;
pub mod filename_utils;
pub mod follower;
pub mod pagination;
pub mod sink;
pub mod twitter;
pub mod username;
