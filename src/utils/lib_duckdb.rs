use duckdb::Connection;

use crate::config::MysqlTarget;

/// Quote an identifier (table or column name) for use in DuckDB SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for use in DuckDB SQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub trait ReplaceTable {
    /// Attach a MySQL database under `alias` using DuckDB's mysql extension.
    /// Tables qualified with the alias are read and written in MySQL.
    fn attach_mysql(&self, target: &MysqlTarget, alias: &str) -> Result<(), duckdb::Error>;

    /// Drop `table` and recreate it from a json file holding an array of
    /// objects.  Every column is a VARCHAR, in the order given.  Returns the
    /// number of rows in the new table.
    fn replace_table_from_json(
        &self,
        table: &str,
        json_path: &str,
        columns: &[String],
    ) -> Result<usize, duckdb::Error>;
}

impl ReplaceTable for Connection {
    fn attach_mysql(&self, target: &MysqlTarget, alias: &str) -> Result<(), duckdb::Error> {
        self.execute_batch(&format!(
            "INSTALL mysql; LOAD mysql; ATTACH {} AS {} (TYPE mysql);",
            quote_literal(&target.connection_string()),
            quote_ident(alias)
        ))
    }

    fn replace_table_from_json(
        &self,
        table: &str,
        json_path: &str,
        columns: &[String],
    ) -> Result<usize, duckdb::Error> {
        let select = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let types = columns
            .iter()
            .map(|c| format!("{}: 'VARCHAR'", quote_literal(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
DROP TABLE IF EXISTS {table};
CREATE TABLE {table} AS
    SELECT {select}
    FROM read_json({path}, format = 'array', columns = {{{types}}});
"#,
            path = quote_literal(json_path),
        );
        self.execute_batch(&sql)?;
        let n: i64 = self.query_row(&format!("SELECT count(*) FROM {table};"), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    }
}
