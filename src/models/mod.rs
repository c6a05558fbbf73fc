use serde::{Deserialize, Serialize};
use std::fmt;

pub mod filter;
pub mod product;
pub mod site;

// Re-exports for convenience
pub use filter::*;
pub use product::*;
pub use site::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    ReadySoon,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::Available => "available",
            Availability::Unavailable => "unavailable",
            Availability::ReadySoon => "ready soon",
        };
        f.write_str(label)
    }
}
