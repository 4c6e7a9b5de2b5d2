//! Reference answer parser
//!
//! Reference answers are newline-delimited text. The first line is a header
//! and is discarded; every following line is one row with `|`-separated
//! fields, coerced to the native type of its column.

use crate::schema::{ColumnSchema, ColumnType};
use nvmefs_core::{Decimal, Error, NaiveDate, Result, Row, Value};

/// Date format of reference fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field separator of reference lines
pub const FIELD_SEPARATOR: char = '|';

/// Parse `reference` into rows typed by `schema`.
///
/// Numeric fields are trimmed before coercion; text fields are passed
/// through untouched and dates must match `YYYY-MM-DD` exactly.
///
/// # Errors
///
/// [`Error::SchemaMismatch`] on the first line with the wrong number of
/// fields or a field that does not coerce. Line numbers are 1-based and
/// count the header.
pub fn parse(reference: &str, schema: &ColumnSchema) -> Result<Vec<Row>> {
    reference
        .lines()
        .enumerate()
        .skip(1)
        .map(|(index, line)| parse_line(line, index + 1, schema))
        .collect()
}

fn parse_line(line: &str, line_number: usize, schema: &ColumnSchema) -> Result<Row> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() != schema.arity() {
        return Err(Error::SchemaMismatch {
            line: line_number,
            column: None,
            reason: format!(
                "expected {} fields, found {}",
                schema.arity(),
                fields.len()
            ),
        });
    }

    fields
        .iter()
        .zip(schema.columns())
        .enumerate()
        .map(|(column, (field, ty))| {
            coerce(field, *ty).map_err(|reason| Error::SchemaMismatch {
                line: line_number,
                column: Some(column),
                reason,
            })
        })
        .collect()
}

/// Coerce one field to `ty`
pub fn coerce(field: &str, ty: ColumnType) -> std::result::Result<Value, String> {
    let raw = if ty.is_numeric() { field.trim() } else { field };
    match ty {
        ColumnType::Text => Ok(Value::Text(raw.to_string())),
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| format!("'{raw}' is not an integer: {e}")),
        ColumnType::Decimal => Decimal::from_str_exact(raw)
            .map(Value::Decimal)
            .map_err(|e| format!("'{raw}' is not a decimal: {e}")),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("'{raw}' is not a float: {e}")),
        ColumnType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|e| format!("'{raw}' is not a YYYY-MM-DD date: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn schema(s: &str) -> ColumnSchema {
        s.parse().unwrap()
    }

    #[test]
    fn parses_typed_row_after_header() {
        let rows = parse(
            "header\n1|2024-01-01|3.50|7\n",
            &schema("int,date,decimal,int"),
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Value::Int(1),
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Value::Decimal(Decimal::new(350, 2)),
                Value::Int(7),
            ]]
        );
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(parse("a|b\n", &schema("text,text")).unwrap().is_empty());
        assert!(parse("", &schema("text")).unwrap().is_empty());
    }

    #[test]
    fn text_is_not_trimmed_numbers_are() {
        let rows = parse("h\n A | 12 \n", &schema("text,int")).unwrap();
        assert_eq!(rows[0], vec![Value::text(" A "), Value::Int(12)]);
    }

    #[test]
    fn float_and_negative_values() {
        let rows = parse("h\n-0.5|-3\n", &schema("float,int")).unwrap();
        assert_eq!(rows[0], vec![Value::Float(-0.5), Value::Int(-3)]);
    }

    #[test]
    fn wrong_arity_reports_line() {
        let err = parse("h\n1|2\n1|2|3\n", &schema("int,int")).unwrap_err();
        match err {
            Error::SchemaMismatch { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_field_reports_line_and_column() {
        let err = parse("h\n1|x\n", &schema("int,decimal")).unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaMismatch {
                line: 2,
                column: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn dates_must_be_iso() {
        assert!(coerce("01/02/2024", ColumnType::Date).is_err());
        assert!(coerce("2024-02-30", ColumnType::Date).is_err());
        assert!(coerce("2024-02-29", ColumnType::Date).is_ok());
    }

    proptest! {
        #[test]
        fn integers_survive_formatting(values in proptest::collection::vec(any::<i64>(), 0..16)) {
            let text = std::iter::once("n".to_string())
                .chain(values.iter().map(|v| v.to_string()))
                .collect::<Vec<_>>()
                .join("\n");
            let rows = parse(&text, &schema("int")).unwrap();
            let expected: Vec<Row> = values.iter().map(|v| vec![Value::Int(*v)]).collect();
            prop_assert_eq!(rows, expected);
        }

        #[test]
        fn text_fields_pass_through(fields in proptest::collection::vec("[^|\r\n]{0,12}", 2..6)) {
            let line = fields.join("|");
            let schema = ColumnSchema::new(vec![ColumnType::Text; fields.len()]);
            let rows = parse(&format!("header\n{line}"), &schema).unwrap();
            let expected: Row = fields.iter().map(|f| Value::text(f.as_str())).collect();
            prop_assert_eq!(&rows[0], &expected);
        }
    }
}
