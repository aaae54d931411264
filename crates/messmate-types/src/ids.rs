use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// A user identifier, assigned by the authentication collaborator.
    UserId
}

string_id! {
    /// A roommate group identifier.
    GroupId
}

string_id! {
    /// An invite identifier.
    InviteId
}

string_id! {
    /// An expense record identifier.
    ExpenseId
}

impl GroupId {
    /// Mint a fresh group id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl InviteId {
    /// Mint a fresh invite id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ExpenseId {
    /// Mint a fresh expense id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl UserId {
    /// Short prefix used when no display name is available
    /// ("Room with a1b2c3").
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(6) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}
