//! Query expression evaluation for in-memory document filtering and sorting.

use bson::{Bson, Document, datetime::DateTime};
use std::{cmp::Ordering, collections::HashMap};

use docmodel_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Comparable view of a BSON value. All numbers compare as `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(String),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(oid) => Comparable::ObjectId(oid.to_hex()),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl Comparable<'_> {
    // Cross-type ordering used for sorting, lowest first.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order for sorting: by type rank, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted path (`point.x`) inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Orders two documents by a list of sort keys.
pub(crate) fn compare_documents(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let a = lookup(left, &key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let b = lookup(right, &key.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => a.sort_cmp(&b),
            SortDirection::Desc => b.sort_cmp(&a),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn matches(document: &'a Document, expr: &Expr) -> bool {
        DocumentEvaluator::new(document)
            .visit_expr(expr)
            .unwrap_or(false)
    }
}

fn contains(haystack: &Comparable<'_>, needle: &Comparable<'_>) -> bool {
    match (haystack, needle) {
        (Comparable::Array(items), needle) => items.iter().any(|item| item == needle),
        (Comparable::String(left), Comparable::String(right)) => left.contains(right),
        _ => false,
    }
}

fn any_of(field: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match (field, values) {
        (Comparable::Array(items), Comparable::Array(values)) => {
            values.iter().any(|value| items.contains(value))
        }
        (Comparable::Array(items), single) => items.contains(single),
        (single, Comparable::Array(values)) => values.contains(single),
        (a, b) => a == b,
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        // A missing field reads as null for equality and passes every negative test.
        let Some(field_value) = lookup(self.document, field) else {
            return Ok(match op {
                FieldOp::Eq => expected == Comparable::Null,
                FieldOp::Ne => expected != Comparable::Null,
                FieldOp::NotContains | FieldOp::NoneOf => true,
                _ => false,
            });
        };
        let actual = Comparable::from(field_value);

        Ok(match op {
            FieldOp::Eq => actual == expected,
            FieldOp::Ne => actual != expected,
            FieldOp::Gt => actual.partial_cmp(&expected) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(
                actual.partial_cmp(&expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FieldOp::Lt => actual.partial_cmp(&expected) == Some(Ordering::Less),
            FieldOp::Lte => matches!(
                actual.partial_cmp(&expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FieldOp::Contains => contains(&actual, &expected),
            FieldOp::NotContains => !contains(&actual, &expected),
            FieldOp::StartsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_of(&actual, &expected),
            FieldOp::NoneOf => !any_of(&actual, &expected),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docmodel_core::query::Filter;

    fn mary() -> Document {
        doc! {
            "_id": "m1",
            "name": "Mary",
            "age": 20_i64,
            "tags": ["admin", "staff"],
            "point": { "x": 1_i64, "y": 2_i64 },
        }
    }

    #[test]
    fn numbers_compare_across_widths() {
        let doc = mary();
        assert!(DocumentEvaluator::matches(&doc, &Filter::eq("age", 20_i32)));
        assert!(DocumentEvaluator::matches(&doc, &Filter::gte("age", 20.0)));
        assert!(!DocumentEvaluator::matches(&doc, &Filter::gt("age", 20_i64)));
    }

    #[test]
    fn dotted_paths_reach_nested_maps() {
        let doc = mary();
        assert!(DocumentEvaluator::matches(&doc, &Filter::eq("point.x", 1_i64)));
        assert!(DocumentEvaluator::matches(&doc, &Filter::exists("point.y")));
        assert!(!DocumentEvaluator::matches(&doc, &Filter::exists("point.z")));
        assert!(DocumentEvaluator::matches(&doc, &Filter::eq("tags.1", "staff")));
    }

    #[test]
    fn missing_fields_behave_like_null() {
        let doc = mary();
        assert!(DocumentEvaluator::matches(&doc, &Filter::eq("email", Bson::Null)));
        assert!(DocumentEvaluator::matches(&doc, &Filter::ne("email", "x@y.z")));
        assert!(!DocumentEvaluator::matches(&doc, &Filter::lt("email", "x")));
    }

    #[test]
    fn array_operators() {
        let doc = mary();
        assert!(DocumentEvaluator::matches(&doc, &Filter::contains("tags", "admin")));
        assert!(DocumentEvaluator::matches(
            &doc,
            &Filter::any_of("name", vec!["Mary", "John"])
        ));
        assert!(DocumentEvaluator::matches(
            &doc,
            &Filter::none_of("tags", vec!["guest"])
        ));
        assert!(!DocumentEvaluator::matches(
            &doc,
            &Filter::none_of("tags", vec!["staff"])
        ));
    }

    #[test]
    fn logical_operators() {
        let doc = mary();
        let expr = Filter::starts_with("name", "Ma")
            .and(Filter::or([Filter::eq("age", 99), Filter::ends_with("name", "ry")]));
        assert!(DocumentEvaluator::matches(&doc, &expr));
        assert!(!DocumentEvaluator::matches(&doc, &expr.not()));
    }

    #[test]
    fn sorting_uses_every_key() {
        let a = doc! { "age": 20, "name": "b" };
        let b = doc! { "age": 20, "name": "a" };
        let c = doc! { "name": "z" };

        let sort = vec![Sort::desc("age"), Sort::asc("name")];
        assert_eq!(compare_documents(&a, &b, &sort), Ordering::Greater);
        // Missing sorts as null, below numbers; descending puts it last.
        assert_eq!(compare_documents(&c, &a, &sort), Ordering::Greater);
    }
}
