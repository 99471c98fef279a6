pub mod ai;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod favorites;
pub mod options;
pub mod parsing;
pub mod recipes;
pub mod render;
pub mod state;

#[cfg(test)]
mod test_support;
