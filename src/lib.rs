//! Research agent service: runs an LLM with search, Wikipedia, URL-fetch and
//! export tools, then normalizes whatever it answered into a complete
//! [`models::ResearchResult`].

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod tasks;
pub mod tools;
pub mod trace;
