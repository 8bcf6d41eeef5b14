use bigdecimal::BigDecimal;
use diesel::backend::Backend;
use diesel::deserialize::{FromSql, Result as DeserializeResult};
use diesel::serialize::{Output, Result as SerializeResult, ToSql};
use diesel::sql_types::Text;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Write;
use std::str::FromStr;

/// Money column. SQLite has no exact decimal type, so amounts are kept as
/// their canonical string form and never pass through floats.
#[derive(
    Debug,
    Clone,
    AsExpression,
    FromSqlRow,
    Default,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[sql_type = "Text"]
#[serde(transparent)]
pub struct BigDecimalField(pub BigDecimal);

impl From<BigDecimalField> for BigDecimal {
    fn from(x: BigDecimalField) -> Self {
        x.0
    }
}

impl From<BigDecimal> for BigDecimalField {
    fn from(x: BigDecimal) -> Self {
        Self(x)
    }
}

impl Display for BigDecimalField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl<DB> ToSql<Text, DB> for BigDecimalField
where
    DB: Backend,
    String: ToSql<Text, DB>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, DB>) -> SerializeResult {
        let s = self.0.to_string();
        s.to_sql(out)
    }
}

impl<DB> FromSql<Text, DB> for BigDecimalField
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> DeserializeResult<Self> {
        let s = String::from_sql(bytes)?;
        match BigDecimal::from_str(&s) {
            Ok(x) => Ok(BigDecimalField(x)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_decimal_field_roundtrips_through_display() {
        let x = BigDecimalField(BigDecimal::from_str("750.50").unwrap());
        assert_eq!(x.to_string(), "750.50");
        assert_eq!(BigDecimal::from_str(&x.to_string()).unwrap(), x.0);
    }
}
