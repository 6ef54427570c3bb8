// src/types/action.rs

use super::resource::Resource;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

/// One decision made by an agent for one tick.
///
/// Also used as the action half of a value-table key, so it stays a small
/// `Copy + Hash` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Buy { resource: Resource, quantity: u32 },
    Sell { resource: Resource, quantity: u32 },
    Hold,
}

impl Action {
    #[inline]
    pub fn buy(resource: Resource, quantity: u32) -> Self {
        Action::Buy { resource, quantity }
    }

    #[inline]
    pub fn sell(resource: Resource, quantity: u32) -> Self {
        Action::Sell { resource, quantity }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Action::Hold)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Action::Buy { .. } => Some(Side::Buy),
            Action::Sell { .. } => Some(Side::Sell),
            Action::Hold => None,
        }
    }

    pub fn resource(&self) -> Option<Resource> {
        match *self {
            Action::Buy { resource, .. } | Action::Sell { resource, .. } => Some(resource),
            Action::Hold => None,
        }
    }

    /// Zero for `Hold`.
    pub fn quantity(&self) -> u32 {
        match *self {
            Action::Buy { quantity, .. } | Action::Sell { quantity, .. } => quantity,
            Action::Hold => 0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy { resource, quantity } => write!(f, "buy {quantity} {resource}"),
            Action::Sell { resource, quantity } => write!(f, "sell {quantity} {resource}"),
            Action::Hold => f.write_str("hold"),
        }
    }
}
