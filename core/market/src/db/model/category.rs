use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{Output, ToSql};
use diesel::sql_types::{Integer, Text};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of service categories a request can be posted in. Providers
/// declare a subset of these in their profile.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[sql_type = "Text"]
pub enum ServiceCategory {
    Plumbing,
    Electrical,
    Cleaning,
    Carpentry,
    Painting,
    Carwash,
    Beauty,
    Catering,
    Photography,
    Tutoring,
}

impl<DB> ToSql<Text, DB> for ServiceCategory
where
    DB: Backend,
    String: ToSql<Text, DB>,
{
    fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, DB>) -> diesel::serialize::Result {
        self.to_string().to_sql(out)
    }
}

impl<DB> FromSql<Text, DB> for ServiceCategory
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        let s = String::from_sql(bytes)?;
        Ok(ServiceCategory::from_str(&s)?)
    }
}

/// Urgency affects the request TTL and how clients sort listings. It has
/// no effect on matching.
#[derive(
    FromPrimitive,
    AsExpression,
    FromSqlRow,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    derive_more::Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sql_type = "Integer"]
pub enum UrgencyLevel {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl<DB: Backend> ToSql<Integer, DB> for UrgencyLevel
where
    i32: ToSql<Integer, DB>,
{
    fn to_sql<W: std::io::Write>(&self, out: &mut Output<W, DB>) -> diesel::serialize::Result {
        (*self as i32).to_sql(out)
    }
}

impl<DB> FromSql<Integer, DB> for UrgencyLevel
where
    i32: FromSql<Integer, DB>,
    DB: Backend,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        let enum_value = i32::from_sql(bytes)?;
        Ok(FromPrimitive::from_i32(enum_value).ok_or(anyhow::anyhow!(
            "Invalid conversion from {} (i32) to UrgencyLevel.",
            enum_value
        ))?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn category_parses_lowercase_names() {
        assert_eq!(
            ServiceCategory::from_str("plumbing").unwrap(),
            ServiceCategory::Plumbing
        );
        assert_eq!(ServiceCategory::Carwash.to_string(), "carwash");
        assert!(ServiceCategory::from_str("exorcism").is_err());
    }

    #[test]
    fn urgency_orders_low_to_critical() {
        assert!(UrgencyLevel::Low < UrgencyLevel::Critical);
        assert_eq!(FromPrimitive::from_i32(3), Some(UrgencyLevel::Critical));
        assert_eq!(<UrgencyLevel as FromPrimitive>::from_i32(7), None);
    }
}
