//! Table schemas.

/// Type of a column, which decides how its values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Int,
    BigInt,
    Double,
    Varchar,
}

impl ColumnType {
    /// Encoded payload size for fixed-width types, `None` for `Varchar`.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(1),
            ColumnType::Int => Some(4),
            ColumnType::BigInt | ColumnType::Double => Some(8),
            ColumnType::Varchar => None,
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of columns describing a table's records.
///
/// # Example
/// ```
/// use heapstore::table::{Column, ColumnList, ColumnType};
///
/// let columns = ColumnList::new(vec![
///     Column::new("id", ColumnType::Int),
///     Column::new("name", ColumnType::Varchar),
/// ]);
/// assert_eq!(columns.len(), 2);
/// assert_eq!(columns.index_of("name"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnList {
    columns: Vec<Column>,
}

impl ColumnList {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Position of the column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl FromIterator<Column> for ColumnList {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(ColumnType::Bool.fixed_size(), Some(1));
        assert_eq!(ColumnType::Int.fixed_size(), Some(4));
        assert_eq!(ColumnType::BigInt.fixed_size(), Some(8));
        assert_eq!(ColumnType::Double.fixed_size(), Some(8));
        assert_eq!(ColumnType::Varchar.fixed_size(), None);
    }

    #[test]
    fn test_column_list_lookup() {
        let columns: ColumnList = vec![
            Column::new("a", ColumnType::Int),
            Column::new("b", ColumnType::Bool),
        ]
        .into_iter()
        .collect();

        assert_eq!(columns.len(), 2);
        assert!(!columns.is_empty());
        assert_eq!(columns.index_of("b"), Some(1));
        assert_eq!(columns.index_of("c"), None);
        assert_eq!(columns.column(0).map(|c| c.column_type), Some(ColumnType::Int));
        assert!(ColumnList::default().is_empty());
    }
}
