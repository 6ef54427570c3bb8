// src/types/mod.rs

pub mod action;
pub mod portfolio;
pub mod resource;

pub use action::{Action, Side};
pub use portfolio::Portfolio;
pub use resource::{Resource, UnknownResource};
