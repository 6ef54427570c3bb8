// src/types/resource.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tradable commodity. The set is fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Water,
    Food,
    Energy,
    Materials,
}

impl Resource {
    pub const COUNT: usize = 4;
    pub const ALL: [Resource; Self::COUNT] = [
        Resource::Water,
        Resource::Food,
        Resource::Energy,
        Resource::Materials,
    ];

    /// Reference price used to normalize the observed price into a ratio.
    /// Never changes during a run.
    pub fn base_price(self) -> f64 {
        match self {
            Resource::Water => 10.0,
            Resource::Food => 15.0,
            Resource::Energy => 25.0,
            Resource::Materials => 20.0,
        }
    }

    /// Position of this resource in [`Resource::ALL`].
    pub fn index(self) -> usize {
        match self {
            Resource::Water => 0,
            Resource::Food => 1,
            Resource::Energy => 2,
            Resource::Materials => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Water => "water",
            Resource::Food => "food",
            Resource::Energy => "energy",
            Resource::Materials => "materials",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource `{0}`")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}
