//! Catalog interface and an in-memory implementation.
//!
//! Redo consults the catalog to skip tables dropped after a record was
//! logged; tables consult it for their schema.

use std::collections::HashMap;

use log::debug;
use parking_lot::RwLock;

use crate::common::{Error, Oid, Result};
use crate::table::ColumnList;

/// Table metadata lookups used by the storage layer.
pub trait Catalog: Send + Sync {
    /// Database owning `table_oid`; `None` if the table does not exist.
    fn database_oid(&self, table_oid: Oid) -> Option<Oid>;

    /// Schema of `table_oid`; `None` if the table does not exist.
    fn column_list(&self, table_oid: Oid) -> Option<ColumnList>;
}

#[derive(Debug, Clone)]
struct TableEntry {
    db_oid: Oid,
    column_list: ColumnList,
}

/// Catalog backed by a map of table oid to database oid and schema.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<Oid, TableEntry>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table.
    ///
    /// Re-registering an oid replaces its entry.
    pub fn create_table(&self, db_oid: Oid, table_oid: Oid, column_list: ColumnList) {
        debug!("catalog: create table {} in database {}", table_oid, db_oid);
        self.tables.write().insert(
            table_oid,
            TableEntry {
                db_oid,
                column_list,
            },
        );
    }

    /// Forget a table.
    ///
    /// # Errors
    /// `Error::TableNotFound` if the table is not registered.
    pub fn drop_table(&self, table_oid: Oid) -> Result<()> {
        debug!("catalog: drop table {}", table_oid);
        self.tables
            .write()
            .remove(&table_oid)
            .map(|_| ())
            .ok_or(Error::TableNotFound(table_oid))
    }

    /// Oids of every registered table, sorted.
    pub fn table_oids(&self) -> Vec<Oid> {
        let mut oids: Vec<Oid> = self.tables.read().keys().copied().collect();
        oids.sort_unstable();
        oids
    }
}

impl Catalog for MemoryCatalog {
    fn database_oid(&self, table_oid: Oid) -> Option<Oid> {
        self.tables.read().get(&table_oid).map(|e| e.db_oid)
    }

    fn column_list(&self, table_oid: Oid) -> Option<ColumnList> {
        self.tables
            .read()
            .get(&table_oid)
            .map(|e| e.column_list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnType};

    #[test]
    fn test_create_and_lookup() {
        let catalog = MemoryCatalog::new();
        let columns = ColumnList::new(vec![Column::new("id", ColumnType::Int)]);
        catalog.create_table(1, 100, columns.clone());

        assert_eq!(catalog.database_oid(100), Some(1));
        assert_eq!(catalog.column_list(100), Some(columns));
        assert_eq!(catalog.database_oid(101), None);
    }

    #[test]
    fn test_drop_table() {
        let catalog = MemoryCatalog::new();
        catalog.create_table(1, 100, ColumnList::default());
        catalog.create_table(1, 50, ColumnList::default());
        assert_eq!(catalog.table_oids(), vec![50, 100]);

        catalog.drop_table(100).unwrap();
        assert_eq!(catalog.database_oid(100), None);
        assert!(matches!(catalog.drop_table(100), Err(Error::TableNotFound(100))));
    }
}
