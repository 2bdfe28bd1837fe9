//! Schema declaration and one-time registration.
//!
//! A [`Schema`] is the immutable description of one model type: its name (used as
//! the type tag of the external representation), the table its records live in, and
//! its fields. Schemas are built with a [`SchemaBuilder`] and validated before any
//! instance of the type can exist; a schema that fails validation is never stored.
//!
//! Each model type owns a [`SchemaCell`], a process-wide slot that holds the schema
//! once it has been registered.

use std::{collections::HashMap, sync::OnceLock};

use crate::{backend::ID_KEY, error::SchemaDeclareError, field::FieldSpec};

/// The registered description of a model type.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    table: String,
    identity: usize,
    fields: Vec<FieldSpec>,
    by_key: HashMap<String, usize>,
    by_raw_key: HashMap<String, usize>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Model name, also the type tag of the external representation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Collection the model's records are stored in.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn identity(&self) -> &FieldSpec {
        &self.fields[self.identity]
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    pub fn field_by_storage_key(&self, raw_key: &str) -> Option<&FieldSpec> {
        self.by_raw_key.get(raw_key).map(|&i| &self.fields[i])
    }

    /// Storage keys of every field, identity included.
    pub fn storage_keys(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.storage_key().to_string())
            .collect()
    }
}

/// Collects the declaration of a model type.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: &'static str,
    table: Option<String>,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validates the declaration and produces the schema.
    pub fn build(self) -> Result<Schema, SchemaDeclareError> {
        let model = self.name.to_string();

        let table = match self.table {
            Some(table) if !table.trim().is_empty() => table,
            _ => return Err(SchemaDeclareError::MissingTable { model }),
        };

        let mut identity: Option<usize> = None;
        let mut by_key = HashMap::with_capacity(self.fields.len());
        let mut by_raw_key = HashMap::with_capacity(self.fields.len());

        for (i, field) in self.fields.iter().enumerate() {
            if by_key.insert(field.key().to_string(), i).is_some() {
                return Err(SchemaDeclareError::DuplicateField {
                    model,
                    field: field.key().to_string(),
                });
            }

            let raw_key = field.storage_key();
            if !is_valid_storage_key(raw_key) {
                return Err(SchemaDeclareError::InvalidRawKey {
                    model,
                    field: field.key().to_string(),
                    raw_key: raw_key.to_string(),
                });
            }
            if by_raw_key.insert(raw_key.to_string(), i).is_some() {
                return Err(SchemaDeclareError::DuplicateRawKey {
                    model,
                    raw_key: raw_key.to_string(),
                });
            }

            if field.is_identity() {
                if let Some(first) = identity {
                    return Err(SchemaDeclareError::DuplicateIdentity {
                        model,
                        first: self.fields[first].key().to_string(),
                        second: field.key().to_string(),
                    });
                }
                if raw_key != ID_KEY {
                    return Err(SchemaDeclareError::IdentityRawKey {
                        model,
                        field: field.key().to_string(),
                        expected: ID_KEY,
                    });
                }
                identity = Some(i);
            }
        }

        let identity = identity.ok_or(SchemaDeclareError::MissingIdentity { model })?;

        Ok(Schema {
            name: self.name,
            table,
            identity,
            fields: self.fields,
            by_key,
            by_raw_key,
        })
    }
}

// Storage keys end up as top-level document keys: no operators, no paths.
fn is_valid_storage_key(raw_key: &str) -> bool {
    !raw_key.is_empty() && !raw_key.starts_with('$') && !raw_key.contains('.')
}

/// Process-wide slot holding a model type's schema once registered.
///
/// ```ignore
/// static SCHEMA: SchemaCell = SchemaCell::new();
/// ```
#[derive(Debug, Default)]
pub struct SchemaCell(OnceLock<Schema>);

impl SchemaCell {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get(&self) -> Option<&Schema> {
        self.0.get()
    }

    /// Builds, validates and stores the schema on first call.
    ///
    /// Later calls return the stored schema without evaluating `declare`. A rejected
    /// declaration leaves the cell empty.
    pub fn register<F>(&self, declare: F) -> Result<&Schema, SchemaDeclareError>
    where
        F: FnOnce() -> SchemaBuilder,
    {
        if let Some(schema) = self.0.get() {
            return Ok(schema);
        }

        let schema = declare().build()?;
        Ok(self.0.get_or_init(|| schema))
    }
}
