//! Background aggregation service
//!
//! Hosts the update orchestrator, the persistent snapshot store, and
//! the badge rendering for the display surface.

pub mod badge;
pub mod orchestrator;
pub mod store;

pub use badge::{badge_for, Badge, DisplaySurface, LogDisplay};
pub use orchestrator::{
    CachedResponse, FetchResponse, Orchestrator, Request, ServiceHandle,
};
pub use store::JsonFileStore;
