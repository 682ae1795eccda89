//! Debate sides and model seating.
//!
//! A debate always has exactly two sides. Which model sits on which side is
//! decided once, when the pair is created, and recorded as a
//! [`ModelAssignment`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Side of the resolution a speaker argues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Affirming the resolution.
    #[serde(rename = "PRO")]
    Pro,
    /// Negating the resolution.
    #[serde(rename = "CON")]
    Con,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Pro, Side::Con];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Pro => "PRO",
            Side::Con => "CON",
        }
    }

    /// Debate-style name used in speech prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Side::Pro => "Affirmative",
            Side::Con => "Negative",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    /// Strict: only the exact wire spellings are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRO" => Ok(Side::Pro),
            "CON" => Ok(Side::Con),
            other => Err(other.to_string()),
        }
    }
}

/// Which half of a mirrored pair an instance is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelAssignment {
    /// First model argues PRO.
    Original,
    /// Second model argues PRO.
    Flipped,
}

impl ModelAssignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAssignment::Original => "original",
            ModelAssignment::Flipped => "flipped",
        }
    }
}

impl fmt::Display for ModelAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two debater models of one session, before seating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelPair {
    pub model_a: String,
    pub model_b: String,
}

impl ModelPair {
    pub fn new(model_a: impl Into<String>, model_b: impl Into<String>) -> Self {
        Self {
            model_a: model_a.into(),
            model_b: model_b.into(),
        }
    }

    /// (pro_model, con_model) for the given seating.
    pub fn seat(&self, assignment: ModelAssignment) -> (&str, &str) {
        match assignment {
            ModelAssignment::Original => (&self.model_a, &self.model_b),
            ModelAssignment::Flipped => (&self.model_b, &self.model_a),
        }
    }
}
