use anyhow::{bail, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn parse(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

/// A table declaration.
///
/// A single primary key column is declared inline. When more than one column is
/// flagged as primary key, a table-level `PRIMARY KEY (...)` constraint is emitted
/// instead, in column declaration order.
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    fn primary_key_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name)
            .collect()
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        let primary_key = self.primary_key_columns();
        let composite_key = primary_key.len() > 1;

        let mut create_sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!("{} {}", column.name, column.sql_type.as_sql()));
            if column.is_primary_key && !composite_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if let Some(default_value) = column.default_value {
                create_sql.push_str(&format!(" DEFAULT {}", default_value));
            }
            if let Some(foreign_key) = column.foreign_key {
                create_sql.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    foreign_key.foreign_table,
                    foreign_key.foreign_column,
                    foreign_key.on_delete.as_sql()
                ));
            }
        }
        if composite_key {
            create_sql.push_str(&format!(", PRIMARY KEY ({})", primary_key.join(", ")));
        }
        create_sql.push_str(");");
        conn.execute(&create_sql, params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns: Vec<Column<'_, String>> = stmt
            .query_map(params![], |row| {
                let declared_type: String = row.get(2)?;
                let sql_type = SqlType::parse(&declared_type).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(2, declared_type.clone(), Type::Text)
                })?;
                Ok(Column {
                    name: row.get(1)?,
                    sql_type,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    // pk holds the 1-based position inside the primary key, 0 if not part of it
                    is_primary_key: row.get::<_, i32>(5)? > 0,
                    foreign_key: None,
                })
            })?
            .collect::<Result<_, _>>()?;

        if actual_columns.is_empty() {
            bail!("Table {} does not exist", self.name);
        }

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found column names: {}, expected: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} Column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type {
                bail!(
                    "Table {} Column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} Column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            // Default values might be wrapped in parentheses
            if actual
                .default_value
                .as_ref()
                .map(strip_leading_and_trailing_parentheses)
                != expected
                    .default_value
                    .map(strip_leading_and_trailing_parentheses)
            {
                bail!(
                    "Table {} Column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} Column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (index_name, _columns) in self.indices {
            let index_exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !index_exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        self.validate_foreign_keys(conn)
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        struct ActualFk {
            from_column: String,
            to_table: String,
            to_column: String,
            on_delete: String,
        }

        // id, seq, table, from, to, on_update, on_delete, match
        let mut fk_stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let actual_fks: Vec<ActualFk> = fk_stmt
            .query_map([], |row| {
                Ok(ActualFk {
                    from_column: row.get(3)?,
                    to_table: row.get(2)?,
                    to_column: row.get(4)?,
                    on_delete: row.get(6)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for column in self.columns {
            let Some(expected_fk) = column.foreign_key else {
                continue;
            };
            let expected_on_delete = expected_fk.on_delete.as_sql();
            let found = actual_fks.iter().any(|actual| {
                actual.from_column == column.name
                    && actual.to_table == expected_fk.foreign_table
                    && actual.to_column == expected_fk.foreign_column
                    && actual.on_delete == expected_on_delete
            });
            if found {
                continue;
            }
            match actual_fks.iter().find(|a| a.from_column == column.name) {
                Some(actual) => bail!(
                    "Table {} column {} has foreign key mismatch: expected REFERENCES {}({}) ON DELETE {}, got REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected_fk.foreign_table,
                    expected_fk.foreign_column,
                    expected_on_delete,
                    actual.to_table,
                    actual.to_column,
                    actual.on_delete
                ),
                None => bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected_fk.foreign_table,
                    expected_fk.foreign_column,
                    expected_on_delete
                ),
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

fn strip_leading_and_trailing_parentheses<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if s.starts_with('(') && s.ends_with(')') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }

    /// Reads `PRAGMA user_version` and maps it back to a schema version.
    pub fn read_version(conn: &Connection) -> Result<i64> {
        let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        Ok(raw_version - BASE_DB_VERSION as i64)
    }
}

pub const BASE_DB_VERSION: usize = 99999;
