//! Usage: OAuth permission scopes an application can request.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Public,
    Private,
    Purchased,
    Create,
    Edit,
    Delete,
    Interact,
    Upload,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Purchased => "purchased",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Interact => "interact",
            Self::Upload => "upload",
        }
    }

    /// Space-separated form the token endpoints expect.
    pub fn combine(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;

    #[test]
    fn combine_joins_with_spaces_in_given_order() {
        assert_eq!(
            Scope::combine(&[Scope::Public, Scope::Private, Scope::Upload]),
            "public private upload"
        );
        assert_eq!(Scope::combine(&[]), "");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let encoded = serde_json::to_string(&Scope::Interact).expect("encode scope");
        assert_eq!(encoded, "\"interact\"");
    }
}
