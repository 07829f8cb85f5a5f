//! Relay behaviour configuration.

use std::fmt;
use std::str::FromStr;

use inkbridge_core::ArmGeometry;
use serde::{Deserialize, Serialize};

/// What happens when a second connection claims a role that is already held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingPolicy {
    /// The newcomer takes the role; the previous holder is unbound but stays open.
    #[default]
    EvictPrevious,
    /// The newcomer is told the role is taken and stays unidentified.
    RejectSecond,
}

impl BindingPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EvictPrevious => "evict-previous",
            Self::RejectSecond => "reject-second",
        }
    }
}

impl fmt::Display for BindingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evict-previous" => Ok(Self::EvictPrevious),
            "reject-second" => Ok(Self::RejectSecond),
            other => Err(format!(
                "unknown binding policy '{other}' (expected evict-previous or reject-second)"
            )),
        }
    }
}

/// Configuration for the message router.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub binding_policy: BindingPolicy,
    /// Link geometry of the arm.
    pub geometry: ArmGeometry,
    /// Decimal places kept on outbound angles.
    pub angle_decimals: u32,
    /// Maximum number of strokes kept in memory.
    pub stroke_log_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            binding_policy: BindingPolicy::default(),
            geometry: ArmGeometry::default(),
            angle_decimals: 2,
            stroke_log_capacity: 1024,
        }
    }
}
