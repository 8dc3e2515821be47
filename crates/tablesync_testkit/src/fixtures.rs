//! Remote record builders and a seeded commerce fixture.
//!
//! Property helpers produce the raw payload shapes the remote sends for each
//! type tag, so tests can describe records without spelling out JSON.

use serde_json::{json, Value};
use tablesync_remote::{MemoryStore, RemoteProperty, RemoteRecord};

/// Database id of the people table.
pub const PEOPLE: &str = "db-people-4b1f9c20";
/// Database id of the companies table.
pub const COMPANIES: &str = "db-companies-8e22d7a1";
/// Database id of the products table.
pub const PRODUCTS: &str = "db-products-0c7a61f5";
/// Database id of the orders table.
pub const ORDERS: &str = "db-orders-15f5ba98";

fn text_runs(content: &str) -> Value {
    json!([{
        "type": "text",
        "text": { "content": content, "link": null },
        "plain_text": content,
    }])
}

/// A title cell.
pub fn title(content: &str) -> RemoteProperty {
    RemoteProperty::new("title", text_runs(content))
}

/// A title cell with no text runs.
pub fn title_empty() -> RemoteProperty {
    RemoteProperty::new("title", json!([]))
}

/// A rich text cell.
pub fn rich_text(content: &str) -> RemoteProperty {
    RemoteProperty::new("rich_text", text_runs(content))
}

/// A number cell.
pub fn number(value: f64) -> RemoteProperty {
    RemoteProperty::new("number", json!(value))
}

/// An unset number cell.
pub fn number_empty() -> RemoteProperty {
    RemoteProperty::new("number", Value::Null)
}

/// A date cell.
pub fn date(start: &str) -> RemoteProperty {
    RemoteProperty::new("date", json!({ "start": start, "end": null, "time_zone": null }))
}

/// A status cell.
pub fn status(name: &str) -> RemoteProperty {
    RemoteProperty::new("status", json!({ "id": "1", "name": name, "color": "default" }))
}

/// A select cell.
pub fn select(name: &str) -> RemoteProperty {
    RemoteProperty::new("select", json!({ "id": "1", "name": name, "color": "blue" }))
}

/// A select cell with no option chosen.
pub fn select_empty() -> RemoteProperty {
    RemoteProperty::new("select", Value::Null)
}

/// A relation cell referencing `ids`.
pub fn relation(ids: &[&str]) -> RemoteProperty {
    let refs: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    RemoteProperty::new("relation", Value::Array(refs))
}

/// A rollup cell. Its payload is never read.
pub fn rollup() -> RemoteProperty {
    RemoteProperty::new(
        "rollup",
        json!({ "type": "array", "array": [], "function": "show_original" }),
    )
}

/// A formula cell with a numeric result.
pub fn formula_number(value: f64) -> RemoteProperty {
    RemoteProperty::new("formula", json!({ "type": "number", "number": value }))
}

/// A formula cell with a string result.
pub fn formula_string(value: &str) -> RemoteProperty {
    RemoteProperty::new("formula", json!({ "type": "string", "string": value }))
}

/// A unique id cell.
pub fn unique_id(prefix: Option<&str>, number: u64) -> RemoteProperty {
    RemoteProperty::new("unique_id", json!({ "prefix": prefix, "number": number }))
}

/// An email cell.
pub fn email(address: &str) -> RemoteProperty {
    RemoteProperty::new("email", json!(address))
}

/// A phone number cell.
pub fn phone(number: &str) -> RemoteProperty {
    RemoteProperty::new("phone_number", json!(number))
}

/// A cell of a type the codec does not know.
pub fn unsupported(tag: &str) -> RemoteProperty {
    RemoteProperty::new(tag, json!([]))
}

/// Builds a [`RemoteRecord`] property by property.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: RemoteRecord,
}

impl RecordBuilder {
    /// Starts a record with the given id.
    pub fn new(id: &str) -> Self {
        Self {
            record: RemoteRecord::new(id),
        }
    }

    /// Adds a property.
    pub fn property(mut self, column: &str, property: RemoteProperty) -> Self {
        self.record = self.record.with_property(column, property);
        self
    }

    /// Finishes the record.
    pub fn build(self) -> RemoteRecord {
        self.record
    }
}

/// People: two filled rows and one that only has remote defaults.
pub fn people_records() -> Vec<RemoteRecord> {
    vec![
        RecordBuilder::new("p-alice")
            .property("name", title("Alice"))
            .property("email", email("alice@example.com"))
            .property("person_id", unique_id(Some("PPL-"), 1))
            .property("state", status("Active"))
            .build(),
        RecordBuilder::new("p-bob")
            .property("name", title("Bob"))
            .property("email", email("bob@example.com"))
            .property("person_id", unique_id(Some("PPL-"), 2))
            .property("state", status("Active"))
            .build(),
        RecordBuilder::new("p-empty")
            .property("name", title_empty())
            .property("email", RemoteProperty::new("email", Value::Null))
            .property("person_id", unique_id(Some("PPL-"), 3))
            .property("state", status("Not started"))
            .build(),
    ]
}

/// Companies: a single row.
pub fn company_records() -> Vec<RemoteRecord> {
    vec![RecordBuilder::new("c-acme")
        .property("name", title("Acme"))
        .property("size", number(250.0))
        .build()]
}

/// Products: two rows, both made by Acme.
pub fn product_records() -> Vec<RemoteRecord> {
    vec![
        RecordBuilder::new("prod-widget")
            .property("name", title("Widget"))
            .property("description", rich_text("Blue widget"))
            .property("unit_price", number(12.5))
            .property("company", relation(&["c-acme"]))
            .property("company_size", rollup())
            .build(),
        RecordBuilder::new("prod-gadget")
            .property("name", title("Gadget"))
            .property("description", rich_text("Pocket gadget"))
            .property("unit_price", number(40.0))
            .property("company", relation(&["c-acme"]))
            .property("company_size", rollup())
            .build(),
    ]
}

/// Orders: one unpaid, one paid.
pub fn order_records() -> Vec<RemoteRecord> {
    vec![
        RecordBuilder::new("o-1")
            .property("order_date", date("2024-12-20"))
            .property("order_status", status("unpaid"))
            .property("price", number(122.49))
            .property("order_id", unique_id(Some("ORD-"), 1))
            .property("product", relation(&["prod-widget"]))
            .property("product_description", rollup())
            .property("buyer", relation(&["p-alice"]))
            .property("seller", relation(&["p-bob"]))
            .property("total", formula_number(122.49))
            .build(),
        RecordBuilder::new("o-2")
            .property("order_date", date("2024-12-21"))
            .property("order_status", status("paid"))
            .property("price", number(80.0))
            .property("order_id", unique_id(Some("ORD-"), 2))
            .property("product", relation(&["prod-gadget"]))
            .property("product_description", rollup())
            .property("buyer", relation(&["p-bob"]))
            .property("seller", relation(&["p-alice"]))
            .property("total", formula_number(80.0))
            .build(),
    ]
}

/// A [`MemoryStore`] seeded with the four commerce databases.
pub fn commerce_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_database(PEOPLE, people_records());
    store.insert_database(COMPANIES, company_records());
    store.insert_database(PRODUCTS, product_records());
    store.insert_database(ORDERS, order_records());
    store
}
