//! Field name <-> column name conversion (spec.md §6).
//!
//! CamelCase field names are converted to snake_case columns by detecting
//! two kinds of word boundary: a lowercase letter followed by an uppercase
//! letter (`studentId` -> `student_Id`), and a run of uppercase letters
//! followed by a lowercase one (`HTTPServer` -> `HTTP_Server`), then
//! lowercasing the whole thing.

/// Convert a CamelCase field name to its default snake_case column name.
///
/// ```
/// use pgcache_util::columns::field_to_column;
///
/// assert_eq!(field_to_column("StudentId"), "student_id");
/// assert_eq!(field_to_column("HTTPServer"), "http_server");
/// ```
pub fn field_to_column(field: &str) -> String {
    let chars: Vec<char> = field.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            let boundary_lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            let boundary_acronym_tail = c.is_uppercase()
                && prev.is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if boundary_lower_to_upper || boundary_acronym_tail {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Convert a snake_case column name back to a CamelCase field name, by
/// uppercasing the first letter of the name and of every letter following
/// an underscore. This is the inverse used to look up row fields by
/// deserialized column name (spec.md §4.3); it does not reconstruct
/// acronym casing (`http_server` becomes `HttpServer`, not `HTTPServer`).
///
/// ```
/// use pgcache_util::columns::column_to_field;
///
/// assert_eq!(column_to_field("student_id"), "StudentId");
/// ```
pub fn column_to_field(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut capitalize_next = true;
    for c in column.chars() {
        if c == '_' {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Normalize a column name used in a trigger argument projection
/// (`columnsToNotify`/`columnsToCheck`, spec.md §4.5): a bare name is
/// qualified to `$1.name`; an already-qualified name is left as-is.
///
/// ```
/// use pgcache_util::columns::normalize_trigger_column;
///
/// assert_eq!(normalize_trigger_column("name"), "$1.name");
/// assert_eq!(normalize_trigger_column("$1.name"), "$1.name");
/// ```
pub fn normalize_trigger_column(column: &str) -> String {
    if column.starts_with("$1.") {
        column.to_string()
    } else {
        format!("$1.{column}")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn examples_from_spec() {
        assert_eq!(field_to_column("StudentId"), "student_id");
        assert_eq!(field_to_column("HTTPServer"), "http_server");
    }

    #[test]
    fn normalizes_bare_and_qualified() {
        assert_eq!(normalize_trigger_column("name"), "$1.name");
        assert_eq!(normalize_trigger_column("$1.name"), "$1.name");
        assert_eq!(normalize_trigger_column("$1.already_ok"), "$1.already_ok");
    }

    /// Round-trip holds for identifiers made of whole, non-acronym words
    /// (the `[A-Z][a-z]+` alphabet) per spec.md §8 invariant 7.
    fn word() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,8}".prop_map(|s| s)
    }

    #[proptest]
    fn round_trip_simple_identifiers(#[strategy(proptest::collection::vec(word(), 1..4))] words: Vec<String>) {
        let field = words.concat();
        let column = field_to_column(&field);
        prop_assert_eq!(column_to_field(&column), field);
    }
}
