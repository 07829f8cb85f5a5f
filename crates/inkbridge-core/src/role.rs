use std::fmt;

use serde::{Deserialize, Serialize};

/// The two distinguished peers a relay binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Arm,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Operator, Role::Arm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Arm => "arm",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
