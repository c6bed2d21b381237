//! Computing and staging index updates.

use recordb_core::{printable, IndexDefinition, Record, RecordType, Subspace, Tuple, Value};
use recordb_storage::{StorageResult, Transaction};
use tracing::trace;

/// The index keys one record change removes and inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexUpdatePlan {
    /// Entry keys to clear.
    pub removals: Vec<Vec<u8>>,
    /// Entry keys to write.
    pub insertions: Vec<Vec<u8>>,
}

impl IndexUpdatePlan {
    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty()
    }

    /// Stage the plan on a transaction: removals first, then insertions.
    ///
    /// # Errors
    ///
    /// Returns the substrate error of the first failing write.
    pub fn apply<T: Transaction>(&self, tx: &mut T) -> StorageResult<()> {
        for key in &self.removals {
            trace!(key = %printable(key), "clear index entry");
            tx.clear(key)?;
        }
        for key in &self.insertions {
            trace!(key = %printable(key), "write index entry");
            tx.put(key, &[])?;
        }
        Ok(())
    }
}

/// Derives index entries for the records of one type.
#[derive(Debug, Clone, Copy)]
pub struct IndexMaintainer<'a> {
    indexes: &'a [IndexDefinition],
    subspace: &'a Subspace,
}

impl<'a> IndexMaintainer<'a> {
    /// A maintainer for the indexes of `record_type`, writing under `subspace`.
    #[must_use]
    pub fn new(record_type: &'a RecordType, subspace: &'a Subspace) -> Self {
        Self { indexes: record_type.indexes(), subspace }
    }

    /// The entry key `subspace ++ pack((name, values..., pk...))`.
    #[must_use]
    pub fn entry_key(&self, index: &IndexDefinition, record: &Record, primary_key: &Tuple) -> Vec<u8> {
        let mut tuple = Tuple::new().with(Value::from(index.name()));
        for value in index.evaluate(record).into_values() {
            tuple.push(value);
        }
        for value in primary_key.values() {
            tuple.push(value.clone());
        }
        self.subspace.pack(&tuple)
    }

    /// Entries to add for a newly inserted record.
    #[must_use]
    pub fn record_inserted(&self, record: &Record, primary_key: &Tuple) -> IndexUpdatePlan {
        IndexUpdatePlan {
            removals: Vec::new(),
            insertions: self.indexes.iter().map(|i| self.entry_key(i, record, primary_key)).collect(),
        }
    }

    /// Entries to swap when a stored record is replaced.
    ///
    /// Indexes whose entry key is unchanged are left alone.
    #[must_use]
    pub fn record_updated(&self, old: &Record, new: &Record, primary_key: &Tuple) -> IndexUpdatePlan {
        let mut plan = IndexUpdatePlan::default();
        for index in self.indexes {
            let old_key = self.entry_key(index, old, primary_key);
            let new_key = self.entry_key(index, new, primary_key);
            if old_key != new_key {
                plan.removals.push(old_key);
                plan.insertions.push(new_key);
            }
        }
        plan
    }

    /// Entries to remove for a deleted record.
    #[must_use]
    pub fn record_deleted(&self, record: &Record, primary_key: &Tuple) -> IndexUpdatePlan {
        IndexUpdatePlan {
            removals: self.indexes.iter().map(|i| self.entry_key(i, record, primary_key)).collect(),
            insertions: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use recordb_core::{FieldDef, FieldType, KeyExpression, MetaData, MetaDataBuilder, RecordTypeDef};
    use std::sync::Arc;

    fn metadata() -> Arc<MetaData> {
        let mut builder = MetaDataBuilder::new();
        builder
            .register_type(
                RecordTypeDef::new("Order")
                    .field(FieldDef::new("order_id", 1, FieldType::Int))
                    .field(FieldDef::new("price", 2, FieldType::Int))
                    .field(FieldDef::optional("flower", 3, FieldType::String)),
            )
            .unwrap()
            .set_primary_key("Order", KeyExpression::field("order_id"))
            .unwrap()
            .add_index("Order", IndexDefinition::new("priceIndex", KeyExpression::field("price")))
            .unwrap()
            .add_index("Order", IndexDefinition::new("flowerIndex", KeyExpression::field("flower")))
            .unwrap();
        builder.build().unwrap()
    }

    fn order(price: i64) -> Record {
        Record::new("Order").with_field("order_id", 1i64).with_field("price", price)
    }

    #[test]
    fn insert_and_delete_are_symmetric() {
        let metadata = metadata();
        let subspace = Subspace::from_bytes(vec![0x02]);
        let maintainer = IndexMaintainer::new(metadata.record_type("Order").unwrap(), &subspace);
        let pk = Tuple::new().with(1i64);

        let inserted = maintainer.record_inserted(&order(10), &pk);
        let deleted = maintainer.record_deleted(&order(10), &pk);
        assert_eq!(inserted.insertions.len(), 2);
        assert!(inserted.removals.is_empty());
        assert_eq!(inserted.insertions, deleted.removals);
    }

    #[test]
    fn entry_key_layout() {
        let metadata = metadata();
        let subspace = Subspace::from_bytes(vec![0x02]);
        let record_type = metadata.record_type("Order").unwrap();
        let maintainer = IndexMaintainer::new(record_type, &subspace);
        let pk = Tuple::new().with(1i64);

        let key = maintainer.entry_key(&record_type.indexes()[0], &order(10), &pk);
        let tuple = subspace.unpack(&key).unwrap();
        assert_eq!(tuple, Tuple::new().with("priceIndex").with(10i64).with(1i64));

        // absent optional field indexes as null
        let key = maintainer.entry_key(&record_type.indexes()[1], &order(10), &pk);
        let tuple = subspace.unpack(&key).unwrap();
        assert_eq!(tuple, Tuple::new().with("flowerIndex").with(Value::Null).with(1i64));
    }

    #[test]
    fn update_touches_only_changed_indexes() {
        let metadata = metadata();
        let subspace = Subspace::from_bytes(vec![0x02]);
        let maintainer = IndexMaintainer::new(metadata.record_type("Order").unwrap(), &subspace);
        let pk = Tuple::new().with(1i64);

        assert!(maintainer.record_updated(&order(10), &order(10), &pk).is_empty());

        let plan = maintainer.record_updated(&order(10), &order(20), &pk);
        assert_eq!(plan.removals.len(), 1);
        assert_eq!(plan.insertions.len(), 1);
        assert_ne!(plan.removals[0], plan.insertions[0]);
    }
}
