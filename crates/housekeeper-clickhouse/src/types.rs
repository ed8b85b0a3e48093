//! ClickHouse column-type model.
//!
//! The HTTP interface reports a type string per column (`Nullable(UInt64)`,
//! `Array(String)`, `DateTime64(3)`). The normalizer only needs the coarse
//! shape, so parsing collapses the zoo of concrete types into a small enum.

/// Coarse column type extracted from ClickHouse metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// `Nullable(T)`; the cell is either null or an inner value.
    Nullable(Box<ColumnType>),
    /// `String`, `FixedString(N)`, `UUID`, `Enum8/16(...)`, `IPv4/6`.
    Text,
    /// `Bool`.
    Bool,
    /// Signed integers of any width.
    Int,
    /// Unsigned integers of any width.
    UInt,
    /// `Float32`/`Float64`/`Decimal(...)`.
    Float,
    /// `Date`, `Date32`, `DateTime`, `DateTime64(...)`, with or without a
    /// timezone argument.
    DateTime,
    /// `Array(T)`.
    Array(Box<ColumnType>),
    /// `Map(String, T)`; keys are strings on the wire.
    Map(Box<ColumnType>),
    /// Anything else; cells pass through the stringified fallback.
    Other(String),
}

impl ColumnType {
    /// Parse a ClickHouse type string. Unknown types are preserved verbatim
    /// under [`ColumnType::Other`], never an error: the normalizer has a
    /// fallback for them.
    pub fn parse(s: &str) -> ColumnType {
        let s = s.trim();

        if let Some(inner) = strip_wrapper(s, "Nullable") {
            return ColumnType::Nullable(Box::new(ColumnType::parse(inner)));
        }
        // LowCardinality is a storage detail, invisible in the JSON output.
        if let Some(inner) = strip_wrapper(s, "LowCardinality") {
            return ColumnType::parse(inner);
        }
        if let Some(inner) = strip_wrapper(s, "Array") {
            return ColumnType::Array(Box::new(ColumnType::parse(inner)));
        }
        if let Some(inner) = strip_wrapper(s, "Map") {
            let value_type = inner
                .split_once(',')
                .map(|(_, v)| v.trim())
                .unwrap_or(inner);
            return ColumnType::Map(Box::new(ColumnType::parse(value_type)));
        }

        match s {
            "Bool" => return ColumnType::Bool,
            "String" | "UUID" | "IPv4" | "IPv6" => return ColumnType::Text,
            _ => {}
        }
        if s.starts_with("FixedString") || s.starts_with("Enum") {
            return ColumnType::Text;
        }
        if s.starts_with("UInt") {
            return ColumnType::UInt;
        }
        if s.starts_with("Int") {
            return ColumnType::Int;
        }
        if s.starts_with("Float") || s.starts_with("Decimal") {
            return ColumnType::Float;
        }
        if s.starts_with("DateTime") || s == "Date" || s == "Date32" {
            return ColumnType::DateTime;
        }
        ColumnType::Other(s.to_string())
    }
}

/// If `s` is `wrapper(inner)`, return `inner`.
fn strip_wrapper<'a>(s: &'a str, wrapper: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(wrapper)?;
    let rest = rest.strip_prefix('(')?;
    rest.strip_suffix(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(ColumnType::parse("String"), ColumnType::Text);
        assert_eq!(ColumnType::parse("FixedString(16)"), ColumnType::Text);
        assert_eq!(ColumnType::parse("Bool"), ColumnType::Bool);
        assert_eq!(ColumnType::parse("UInt64"), ColumnType::UInt);
        assert_eq!(ColumnType::parse("UInt8"), ColumnType::UInt);
        assert_eq!(ColumnType::parse("Int32"), ColumnType::Int);
        assert_eq!(ColumnType::parse("Float64"), ColumnType::Float);
        assert_eq!(ColumnType::parse("Decimal(18, 4)"), ColumnType::Float);
    }

    #[test]
    fn test_parse_datetimes() {
        assert_eq!(ColumnType::parse("Date"), ColumnType::DateTime);
        assert_eq!(ColumnType::parse("DateTime"), ColumnType::DateTime);
        assert_eq!(ColumnType::parse("DateTime64(3)"), ColumnType::DateTime);
        assert_eq!(
            ColumnType::parse("DateTime('Europe/Berlin')"),
            ColumnType::DateTime
        );
    }

    #[test]
    fn test_parse_nullable() {
        assert_eq!(
            ColumnType::parse("Nullable(UInt64)"),
            ColumnType::Nullable(Box::new(ColumnType::UInt))
        );
        assert_eq!(
            ColumnType::parse("Nullable(DateTime64(9))"),
            ColumnType::Nullable(Box::new(ColumnType::DateTime))
        );
    }

    #[test]
    fn test_parse_low_cardinality_is_transparent() {
        assert_eq!(ColumnType::parse("LowCardinality(String)"), ColumnType::Text);
        assert_eq!(
            ColumnType::parse("Nullable(LowCardinality(String))"),
            ColumnType::Nullable(Box::new(ColumnType::Text))
        );
    }

    #[test]
    fn test_parse_containers() {
        assert_eq!(
            ColumnType::parse("Array(UInt64)"),
            ColumnType::Array(Box::new(ColumnType::UInt))
        );
        assert_eq!(
            ColumnType::parse("Array(Array(String))"),
            ColumnType::Array(Box::new(ColumnType::Array(Box::new(ColumnType::Text))))
        );
        assert_eq!(
            ColumnType::parse("Map(String, UInt64)"),
            ColumnType::Map(Box::new(ColumnType::UInt))
        );
    }

    #[test]
    fn test_parse_unknown_preserved() {
        assert_eq!(
            ColumnType::parse("AggregateFunction(sum, UInt64)"),
            ColumnType::Other("AggregateFunction(sum, UInt64)".to_string())
        );
    }
}
