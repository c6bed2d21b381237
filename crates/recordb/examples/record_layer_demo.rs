//! Record Layer Demo
//!
//! This example walks through the record store on the in-memory substrate:
//! - Building a catalog with two record types keyed by record type and id,
//!   where `Order` carries a nested `Flower` message
//! - Clearing the store's subspace
//! - Saving records and loading present and absent keys
//! - Scanning every record, then dumping the raw substrate entries
//!
//! Run with: cargo run --example record_layer_demo
//! Set `RUST_LOG=recordb=trace` to see index and commit traces.

use std::ops::Bound;
use std::sync::Arc;

use recordb::{
    printable, Cursor, EnumDef, Error, FieldDef, FieldType, IndexDefinition, KeyExpression,
    MemoryEngine, MessageDef, MetaData, MetaDataBuilder, RangeOptions, Record, RecordStore,
    RecordTypeDef, ScanDirection, Subspace, Transaction, TransactionRunner, Tuple,
};
use tracing_subscriber::EnvFilter;

/// Open (or create) the demo store inside a unit of work.
fn provider<'t, T: Transaction>(
    tx: &'t mut T,
    metadata: &Arc<MetaData>,
    path: &Subspace,
) -> recordb::Result<RecordStore<'t, T>> {
    RecordStore::builder().metadata(Arc::clone(metadata)).subspace(path.clone()).create_or_open(tx)
}

fn main() -> recordb::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    println!("=== Record Layer Demo ===\n");

    let color = EnumDef::new("Color", ["RED", "YELLOW", "WHITE"]);
    let flower = MessageDef::new("Flower")
        .field(FieldDef::new("type", 1, FieldType::String))
        .field(FieldDef::optional("color", 2, FieldType::Enum(color.clone())));
    let keyed_by_order_id =
        || KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("order_id")]);

    let mut builder = MetaDataBuilder::new();
    builder
        .register_type(
            RecordTypeDef::new("Order")
                .field(FieldDef::new("order_id", 1, FieldType::Int))
                .field(FieldDef::new("price", 2, FieldType::Int))
                .field(FieldDef::optional("flower", 3, FieldType::Message(flower))),
        )?
        .set_primary_key("Order", keyed_by_order_id())?
        .add_index("Order", IndexDefinition::new("priceIndex", KeyExpression::field("price")))?
        .register_type(
            RecordTypeDef::new("Person")
                .field(FieldDef::new("order_id", 1, FieldType::Int))
                .field(FieldDef::optional("foo", 2, FieldType::String)),
        )?
        .set_primary_key("Person", keyed_by_order_id())?;
    let metadata = builder.build()?;

    for record_type in metadata.record_types() {
        println!("{} => recordTypeKey = {}", record_type.name(), record_type.key());
    }
    println!();

    let path = Subspace::new(&Tuple::new().with("record-layer-demo"));
    let runner = TransactionRunner::new(MemoryEngine::new());

    // ========================================
    // Clear the subspace
    // ========================================
    runner.run(|tx| {
        let (start, end) = path.range();
        tx.clear_range(&start, &end)?;
        Ok(())
    })?;

    // ========================================
    // Save
    // ========================================
    let red = color.value("RED").ok_or_else(|| Error::Schema("Color has no RED".into()))?;
    let rose = Record::new("Flower").with_field("type", "ROSE").with_field("color", red);
    runner.run(|tx| {
        let mut store = provider(tx, &metadata, &path)?;
        store.save_record(
            &Record::new("Order")
                .with_field("order_id", 1i64)
                .with_field("price", 123i64)
                .with_message("flower", rose.clone()),
        )?;
        store.save_record(&Record::new("Person").with_field("order_id", 1i64).with_field("foo", "lala"))?;
        Ok(())
    })?;
    println!("Saved one Order and one Person\n");

    // ========================================
    // Load
    // ========================================
    let person_key = metadata
        .record_type("Person")
        .map(|t| t.key().clone())
        .ok_or_else(|| Error::Schema("Person is not registered".into()))?;
    let person = |id: i64| Tuple::new().with(person_key.clone()).with(id);

    let stored = runner.run(|tx| provider(tx, &metadata, &path)?.load_record_by_key(&person(1)))?;
    match &stored {
        Some(stored) => {
            println!("Loaded {} {}: {:?}", stored.record_type(), stored.primary_key, stored.record);
        }
        None => println!("Person 1 is missing"),
    }

    let missing = runner.run(|tx| provider(tx, &metadata, &path)?.load_record_by_key(&person(99_999)))?;
    println!("Person 99999 exists: {}\n", missing.is_some());

    // ========================================
    // Scan all records
    // ========================================
    println!("--- All records ---");
    runner.run(|tx| {
        let store = provider(tx, &metadata, &path)?;
        for stored in store.scan_all_records(ScanDirection::Forward)? {
            let stored = stored?;
            println!("{} {} {:?}", stored.record_type(), stored.primary_key, stored.record);
        }
        Ok(())
    })?;
    println!();

    // ========================================
    // Raw substrate entries
    // ========================================
    println!("--- Raw entries ---");
    runner.read(|tx| {
        let mut cursor = tx.range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new().limit(100))?;
        while let Some((key, value)) = cursor.next()? {
            println!("Key:   {}", printable(&key));
            println!("Value: {}", printable(&value));
            println!("----");
        }
        Ok(())
    })?;

    Ok(())
}
