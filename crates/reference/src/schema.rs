//! Column schemas for reference answers

use nvmefs_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Native type a reference field is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Raw string, passed through untouched
    Text,
    /// Base-10 signed 64-bit integer
    Integer,
    /// Exact decimal
    Decimal,
    /// 64-bit float
    Float,
    /// `YYYY-MM-DD` calendar date
    Date,
}

impl ColumnType {
    /// Whether surrounding whitespace is trimmed before coercion
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Decimal | ColumnType::Float
        )
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "str" | "string" | "varchar" => Ok(ColumnType::Text),
            "int" | "integer" | "bigint" => Ok(ColumnType::Integer),
            "decimal" | "numeric" => Ok(ColumnType::Decimal),
            "float" | "double" => Ok(ColumnType::Float),
            "date" => Ok(ColumnType::Date),
            other => Err(Error::config(format!("unknown column type '{other}'"))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "int",
            ColumnType::Decimal => "decimal",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
        })
    }
}

/// Ordered column types of one reference answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema(Vec<ColumnType>);

impl ColumnSchema {
    /// Schema over `columns`
    pub fn new(columns: impl Into<Vec<ColumnType>>) -> Self {
        Self(columns.into())
    }

    /// Column types in order
    pub fn columns(&self) -> &[ColumnType] {
        &self.0
    }

    /// Number of columns
    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for ColumnSchema {
    type Err = Error;

    /// Parse a comma-separated list such as `text,int,decimal`
    fn from_str(s: &str) -> Result<Self> {
        let columns = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<ColumnType>>>()?;
        Ok(Self(columns))
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{column}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_with_aliases() {
        let schema: ColumnSchema = "text, INTEGER,numeric,double,date".parse().unwrap();
        assert_eq!(
            schema.columns(),
            &[
                ColumnType::Text,
                ColumnType::Integer,
                ColumnType::Decimal,
                ColumnType::Float,
                ColumnType::Date,
            ]
        );
        assert_eq!(schema.to_string(), "text,int,decimal,float,date");
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!("text,blob".parse::<ColumnSchema>().is_err());
        assert!("".parse::<ColumnSchema>().is_err());
    }

    #[test]
    fn only_numbers_are_trimmed() {
        assert!(ColumnType::Decimal.is_numeric());
        assert!(!ColumnType::Text.is_numeric());
        assert!(!ColumnType::Date.is_numeric());
    }
}
