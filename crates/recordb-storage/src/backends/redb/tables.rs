//! Redb table definitions.

use redb::TableDefinition;

/// The physical table that stores every substrate key.
pub(crate) const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("recordb_data");
