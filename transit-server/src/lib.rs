//! Transit feed server.
//!
//! Loads a GTFS-style feed into SQLite, builds a stop-to-stop graph from the
//! trips in it, and answers "how do I get from this stop to that one with the
//! fewest hops?" over HTTP.

pub mod config;
pub mod domain;
pub mod feed;
pub mod graph;
pub mod web;
