use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as DeserializeResult};
use diesel::serialize::{Output, Result as SerializeResult, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Id [{0}] has invalid format.")]
pub struct ParseIdError(pub String);

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, AsExpression, FromSqlRow, Serialize, Deserialize,
        )]
        #[sql_type = "Text"]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                $name(Uuid::new_v4().to_simple().to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() || s.contains(char::is_whitespace) {
                    return Err(ParseIdError(s.to_string()));
                }
                Ok($name(s.to_string()))
            }
        }

        impl<DB> ToSql<Text, DB> for $name
        where
            DB: Backend,
            String: ToSql<Text, DB>,
        {
            fn to_sql<W: Write>(&self, out: &mut Output<W, DB>) -> SerializeResult {
                self.0.to_sql(out)
            }
        }

        impl<DB> FromSql<Text, DB> for $name
        where
            DB: Backend,
            String: FromSql<Text, DB>,
        {
            fn from_sql(bytes: Option<&DB::RawValue>) -> DeserializeResult<Self> {
                Ok($name(String::from_sql(bytes)?))
            }
        }
    };
}

entity_id!(RequestId);
entity_id!(BidId);

/// Authenticated principal handed in by the identity service. The engine
/// trusts the id as-is and never resolves it further.
entity_id!(ActorId);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_parseable() {
        let id = RequestId::generate();
        let other = RequestId::generate();
        assert_ne!(id, other);
        assert_eq!(RequestId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn rejects_empty_and_whitespace_ids() {
        assert!(ActorId::from_str("").is_err());
        assert!(ActorId::from_str("prov ider").is_err());
    }
}
