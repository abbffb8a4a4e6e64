//! Strongly-typed identifiers (avoid mixing UUIDs of different entities).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh time-ordered identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// User identifier (owned by the external user directory).
    UserId
);
uuid_id!(
    /// Role identifier.
    RoleId
);
uuid_id!(
    /// Catalog permission identifier.
    PermissionId
);
uuid_id!(
    /// Process identifier (owned by the external process directory).
    ProcessId
);
uuid_id!(
    /// Stage identifier; a stage belongs to exactly one process.
    StageId
);
uuid_id!(
    /// Grant row identifier.
    GrantId
);
