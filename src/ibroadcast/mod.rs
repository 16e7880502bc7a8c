//! iBroadcast remote playlist store

pub mod client;
pub mod models;

pub use client::IbroadcastSession;
