//! Shared procedure and per-table trigger SQL generation (spec.md §4.5).
//! Pure string formatting, mirroring the source's `CreateFunction`/
//! `CreateTriggerIfNotExists` pair (`trigger.go`) but carrying the two
//! column projections as trigger arguments instead of hard-coding
//! `row_to_json(NEW)`.

use pgcache_util::columns::normalize_trigger_column;

/// The name of the shared trigger function installed once per database.
pub const FUNCTION_NAME: &str = "pgcache_notify";

/// The name given to every per-table trigger this crate installs.
pub const TRIGGER_NAME: &str = "pgcache_notify";

/// The shared PL/pgSQL function every per-table trigger invokes. Its two
/// arguments, `columns_to_notify` and `columns_to_check`, are SQL
/// expression text referencing the row via the `$1` positional parameter
/// (spec.md §6's `$1.name` qualification) — `columns_to_notify` must
/// evaluate, against `$1 = OLD` or `$1 = NEW`, to a JSON object of the
/// row's cached columns; `columns_to_check` (optional) must evaluate to a
/// composite value compared for equality across OLD and NEW to decide
/// whether an UPDATE is worth notifying at all.
pub fn function_sql() -> String {
    format!(
        r#"CREATE OR REPLACE FUNCTION {FUNCTION_NAME}() RETURNS TRIGGER AS $$
DECLARE
    columns_to_notify text := TG_ARGV[0];
    columns_to_check  text := TG_ARGV[1];
    old_check jsonb;
    new_check jsonb;
    old_payload jsonb;
    new_payload jsonb;
BEGIN
    IF TG_OP = 'UPDATE' AND columns_to_check <> '' THEN
        EXECUTE format('SELECT to_jsonb(%s)', columns_to_check) USING OLD INTO old_check;
        EXECUTE format('SELECT to_jsonb(%s)', columns_to_check) USING NEW INTO new_check;
        IF old_check = new_check THEN
            RETURN NULL;
        END IF;
    END IF;

    IF TG_OP <> 'INSERT' THEN
        EXECUTE format('SELECT %s', columns_to_notify) USING OLD INTO old_payload;
    END IF;
    IF TG_OP <> 'DELETE' THEN
        EXECUTE format('SELECT %s', columns_to_notify) USING NEW INTO new_payload;
    END IF;

    PERFORM pg_notify(
        'pgnotify_' || TG_TABLE_SCHEMA || '.' || TG_TABLE_NAME,
        jsonb_build_object('action', TG_OP, 'old', old_payload, 'new', new_payload)::text
    );
    RETURN NULL;
END;
$$ LANGUAGE plpgsql;"#
    )
}

/// The `DROP TRIGGER IF EXISTS` + `CREATE TRIGGER` pair for `table`
/// (already schema-qualified), re-installed idempotently on every call
/// (spec.md §4.5: "re-installed idempotently by dropping and creating").
pub fn table_trigger_sql(table: &str, columns_to_notify: &str, columns_to_check: &str) -> String {
    format!(
        r#"DROP TRIGGER IF EXISTS {TRIGGER_NAME} ON {table};
CREATE TRIGGER {TRIGGER_NAME}
    AFTER INSERT OR UPDATE OR DELETE ON {table}
    FOR EACH ROW EXECUTE FUNCTION {FUNCTION_NAME}('{notify}', '{check}');"#,
        notify = escape_literal(columns_to_notify),
        check = escape_literal(columns_to_check),
    )
}

/// The standalone `DROP TRIGGER IF EXISTS` statement for `table`, used to
/// roll back a partially-completed `Add` (spec.md §7: "partial state
/// rolled back by dropping the trigger").
pub fn drop_trigger_sql(table: &str) -> String {
    format!("DROP TRIGGER IF EXISTS {TRIGGER_NAME} ON {table};")
}

/// Build the `columns_to_notify` projection: a `json_build_object(...)`
/// expression keyed by each column's bare name, valued by its `$1.`-
/// qualified reference (spec.md §6).
pub fn notify_projection(columns: &[&str]) -> String {
    let pairs: Vec<String> = columns
        .iter()
        .map(|c| format!("'{}', {}", bare_name(c), normalize_trigger_column(c)))
        .collect();
    format!("json_build_object({})", pairs.join(", "))
}

/// Build the `columns_to_check` projection: a `ROW(...)` of the `$1.`-
/// qualified columns to compare across OLD/NEW on UPDATE, or the empty
/// string when no check columns are configured (every UPDATE notifies).
pub fn check_projection(columns: &[&str]) -> String {
    if columns.is_empty() {
        return String::new();
    }
    let quals: Vec<String> = columns.iter().map(|c| normalize_trigger_column(c)).collect();
    format!("ROW({})", quals.join(", "))
}

fn bare_name(column: &str) -> &str {
    column.strip_prefix("$1.").unwrap_or(column)
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_projection_quotes_bare_names_and_qualifies_values() {
        assert_eq!(
            notify_projection(&["student_id", "score"]),
            "json_build_object('student_id', $1.student_id, 'score', $1.score)"
        );
    }

    #[test]
    fn notify_projection_accepts_already_qualified_columns() {
        assert_eq!(
            notify_projection(&["$1.student_id"]),
            "json_build_object('student_id', $1.student_id)"
        );
    }

    #[test]
    fn check_projection_empty_when_no_columns() {
        assert_eq!(check_projection(&[]), "");
    }

    #[test]
    fn check_projection_wraps_in_row() {
        assert_eq!(check_projection(&["score"]), "ROW($1.score)");
    }

    #[test]
    fn table_trigger_sql_escapes_single_quotes_in_projections() {
        let sql = table_trigger_sql("public.scores", "json_build_object('it''s', $1.x)", "");
        assert!(sql.contains("json_build_object(''it''''s'', $1.x)"));
        assert!(sql.contains("DROP TRIGGER IF EXISTS pgcache_notify ON public.scores"));
        assert!(sql.contains("CREATE TRIGGER pgcache_notify"));
    }

    #[test]
    fn function_sql_names_the_shared_function() {
        assert!(function_sql().contains("CREATE OR REPLACE FUNCTION pgcache_notify()"));
    }

    #[test]
    fn drop_trigger_sql_names_the_table_and_trigger() {
        assert_eq!(drop_trigger_sql("public.scores"), "DROP TRIGGER IF EXISTS pgcache_notify ON public.scores;");
    }
}
