//! Shared fixtures for the record store integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use recordb::{
    EnumDef, FieldDef, FieldType, IndexDefinition, KeyExpression, MemoryEngine, MessageDef,
    MetaData, MetaDataBuilder, Record, RecordStore, RecordTypeDef, Result, RunnerConfig,
    Subspace, Transaction, TransactionRunner, Tuple,
};

/// The flower colors used by `Flower.color`.
pub fn color() -> EnumDef {
    EnumDef::new("Color", ["RED", "YELLOW", "WHITE"])
}

/// The `Flower` message carried by `Order.flower`.
pub fn flower_def() -> MessageDef {
    MessageDef::new("Flower")
        .field(FieldDef::new("type", 1, FieldType::String))
        .field(FieldDef::optional("color", 2, FieldType::Enum(color())))
}

/// The `Order` record type, before keys and indexes are attached.
pub fn order_def() -> RecordTypeDef {
    RecordTypeDef::new("Order")
        .field(FieldDef::new("order_id", 1, FieldType::Int))
        .field(FieldDef::new("price", 2, FieldType::Int))
        .field(FieldDef::optional("flower", 3, FieldType::Message(flower_def())))
}

/// `Order` and `Person` types keyed by record type plus id, with a
/// `priceIndex` on orders and a `nameIndex` on people.
pub fn metadata() -> Arc<MetaData> {
    let mut builder = MetaDataBuilder::new();
    builder
        .register_type(order_def())
        .expect("failed to register Order")
        .set_primary_key(
            "Order",
            KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("order_id")]),
        )
        .expect("failed to set Order primary key")
        .add_index("Order", IndexDefinition::new("priceIndex", KeyExpression::field("price")))
        .expect("failed to add priceIndex")
        .register_type(
            RecordTypeDef::new("Person")
                .field(FieldDef::new("person_id", 1, FieldType::Int))
                .field(FieldDef::new("name", 2, FieldType::String)),
        )
        .expect("failed to register Person")
        .set_primary_key(
            "Person",
            KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("person_id")]),
        )
        .expect("failed to set Person primary key")
        .add_index("Person", IndexDefinition::new("nameIndex", KeyExpression::field("name")))
        .expect("failed to add nameIndex");
    builder.build().expect("failed to build metadata")
}

pub fn subspace() -> Subspace {
    Subspace::new(&Tuple::new().with("record-store-tests"))
}

/// A runner on a fresh memory engine that retries without sleeping.
pub fn runner() -> TransactionRunner<MemoryEngine> {
    runner_on(MemoryEngine::new())
}

pub fn runner_on(engine: MemoryEngine) -> TransactionRunner<MemoryEngine> {
    TransactionRunner::with_config(engine, RunnerConfig::new().initial_backoff(Duration::ZERO))
}

pub fn order(id: i64, price: i64) -> Record {
    Record::new("Order").with_field("order_id", id).with_field("price", price)
}

/// A `Flower` message; `color` names a variant of [`color`].
pub fn flower(kind: &str, color_name: &str) -> Record {
    let mut flower = Record::new("Flower").with_field("type", kind);
    if let Some(value) = color().value(color_name) {
        flower.set_field("color", value);
    }
    flower
}

pub fn person(id: i64, name: &str) -> Record {
    Record::new("Person").with_field("person_id", id).with_field("name", name)
}

pub fn pk(id: i64) -> Tuple {
    Tuple::new().with(id)
}

pub fn open<'t, T: Transaction>(metadata: &Arc<MetaData>, tx: &'t mut T) -> Result<RecordStore<'t, T>> {
    RecordStore::builder().metadata(Arc::clone(metadata)).subspace(subspace()).create_or_open(tx)
}
