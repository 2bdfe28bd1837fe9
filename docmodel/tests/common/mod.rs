#![allow(dead_code)]

use bson::Bson;
use docmodel::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug)]
pub struct Foo(Record);

impl Model for Foo {
    fn declare() -> SchemaBuilder {
        Schema::builder("Foo")
            .table("foo")
            .field(Field::identity("foo_id"))
            .field(Field::string("str_field"))
            .field(Field::int("int_field").default(0))
            .field(Field::list("list_field"))
    }

    fn schema_cell() -> &'static SchemaCell {
        static SCHEMA: SchemaCell = SchemaCell::new();
        &SCHEMA
    }

    fn from_record(record: Record) -> Self {
        Foo(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}

#[derive(Debug)]
pub struct Person(Record);

impl Model for Person {
    fn declare() -> SchemaBuilder {
        Schema::builder("Person")
            .table("people")
            .field(Field::identity_with("person_id", IdGenerator::Uuid))
            .field(Field::string("name").raw_key("n"))
            .field(Field::int("age"))
            .field(Field::bool("active"))
            .field(Field::date("birthday"))
            .field(Field::structured::<Point>("home"))
            .field(Field::list("tags"))
    }

    fn schema_cell() -> &'static SchemaCell {
        static SCHEMA: SchemaCell = SchemaCell::new();
        &SCHEMA
    }

    fn from_record(record: Record) -> Self {
        Person(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}

#[derive(Debug)]
pub struct Ticket(Record);

impl Model for Ticket {
    fn declare() -> SchemaBuilder {
        Schema::builder("Ticket")
            .table("tickets")
            .field(Field::identity("ticket_id"))
            .field(Field::string("token").default_with(|| {
                Bson::String(uuid::Uuid::new_v4().to_string())
            }))
    }

    fn schema_cell() -> &'static SchemaCell {
        static SCHEMA: SchemaCell = SchemaCell::new();
        &SCHEMA
    }

    fn from_record(record: Record) -> Self {
        Ticket(record)
    }

    fn record(&self) -> &Record {
        &self.0
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}

/// A fresh in-memory store with every test model registered.
pub fn store() -> DocumentStore<InMemoryStore> {
    Foo::register().expect("Foo schema is valid");
    Person::register().expect("Person schema is valid");
    Ticket::register().expect("Ticket schema is valid");
    DocumentStore::new(InMemoryStore::new())
}
