use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Stored lowercase in SQLite; serialized SCREAMING_SNAKE on the wire.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

str_enum!(ProposalStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(ApprovalStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(ConfidenceLevel {
    High => "high",
    Medium => "medium",
    Low => "low",
});

str_enum!(FieldSource {
    Ai => "ai",
    User => "user",
});

/// The five extracted attributes of a proposal. Stored (and serialized)
/// under the camelCase names the review dashboard keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    CompanyName,
    ContactName,
    Email,
    Phone,
    Trade,
}

impl FieldName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyName => "companyName",
            Self::ContactName => "contactName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Trade => "trade",
        }
    }

    pub fn all() -> &'static [FieldName] {
        &[
            Self::CompanyName,
            Self::ContactName,
            Self::Email,
            Self::Phone,
            Self::Trade,
        ]
    }
}

impl std::str::FromStr for FieldName {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "companyName" => Ok(Self::CompanyName),
            "contactName" => Ok(Self::ContactName),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "trade" => Ok(Self::Trade),
            _ => Err(DatabaseError::InvalidEnum {
                field: "FieldName".into(),
                value: s.into(),
            }),
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
