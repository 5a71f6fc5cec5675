//! MariaDB DDL generation.

use crate::core::MappedColumn;

/// Storage engine for created tables.
pub const TABLE_ENGINE: &str = "InnoDB";

/// Default character set for created tables.
pub const TABLE_CHARSET: &str = "utf8mb4";

/// Quote a MariaDB identifier.
///
/// Table and column names come from the operator's table list and the source
/// catalog and are trusted; only embedded backticks are doubled.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render one column definition.
pub fn column_definition(col: &MappedColumn) -> String {
    let mut def = format!(
        "{} {} {}",
        quote_ident(&col.name),
        col.target_type,
        col.nullability
    );
    if let Some(comment) = &col.comment {
        def.push(' ');
        def.push_str(comment);
    }
    def
}

/// Build a `CREATE TABLE IF NOT EXISTS` statement.
///
/// Columns appear in the order given. Re-running the statement against an
/// existing table is a no-op; it never alters a table created earlier.
pub fn build_create_table(table: &str, columns: &[MappedColumn]) -> String {
    let col_defs: Vec<String> = columns.iter().map(column_definition).collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n) ENGINE={} DEFAULT CHARSET={}",
        quote_ident(table),
        col_defs.join(",\n  "),
        TABLE_ENGINE,
        TABLE_CHARSET
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnDescriptor;
    use crate::dialect::map_column;

    fn mapped(cols: &[ColumnDescriptor]) -> Vec<MappedColumn> {
        cols.iter().map(map_column).collect()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "`orders`");
        assert_eq!(quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_build_create_table() {
        let columns = mapped(&[
            ColumnDescriptor::new("id", "int").not_null(),
            ColumnDescriptor::new("name", "nvarchar")
                .with_length(50)
                .with_description("Display name"),
            ColumnDescriptor::new("amount", "money"),
        ]);

        let ddl = build_create_table("orders", &columns);
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS `orders` (\n  \
             `id` INT NOT NULL,\n  \
             `name` VARCHAR(50) NULL COMMENT 'Display name',\n  \
             `amount` DECIMAL(19,4) NULL\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_columns_keep_input_order() {
        let columns = mapped(&[
            ColumnDescriptor::new("zeta", "int"),
            ColumnDescriptor::new("alpha", "int"),
            ColumnDescriptor::new("mid", "int"),
        ]);
        let ddl = build_create_table("t", &columns);

        let zeta = ddl.find("`zeta`").unwrap();
        let alpha = ddl.find("`alpha`").unwrap();
        let mid = ddl.find("`mid`").unwrap();
        assert!(zeta < alpha && alpha < mid);
        assert_eq!(ddl.matches(" NULL").count(), 3);
    }

    #[test]
    fn test_not_null_only_for_non_nullable() {
        let columns = mapped(&[
            ColumnDescriptor::new("a", "int").not_null(),
            ColumnDescriptor::new("b", "int"),
        ]);
        let ddl = build_create_table("t", &columns);
        assert!(ddl.contains("`a` INT NOT NULL"));
        assert!(ddl.contains("`b` INT NULL"));
        assert_eq!(ddl.matches("NOT NULL").count(), 1);
    }

    #[test]
    fn test_comment_escapes_single_quotes() {
        let columns = mapped(&[ColumnDescriptor::new("note", "text")
            .with_description("owner's 'primary' note")]);
        let ddl = build_create_table("t", &columns);
        assert!(ddl.contains("COMMENT 'owner\\'s \\'primary\\' note'"));
        assert_eq!(ddl.matches("COMMENT").count(), 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let columns = mapped(&[ColumnDescriptor::new("id", "bigint").not_null()]);
        assert_eq!(
            build_create_table("t", &columns),
            build_create_table("t", &columns)
        );
    }
}
