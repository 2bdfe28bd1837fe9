//! Lazy query results materialized as models.

use bson::Document;
use futures::{Stream, stream};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    cursor::Cursor,
    error::{ModelError, ModelResult},
    model::Model,
    page::{Page, PaginationParams},
    query::{Sort, SortDirection},
    record::Record,
    schema::Schema,
};

/// The result of [`ModelCollection::fetch`](crate::collection::ModelCollection::fetch).
///
/// Holds the root cursor of the query and a working cursor that `sort`, `skip` and
/// `limit` compose onto. Nothing runs until the result is indexed, iterated or
/// counted. [`reset`](Self::reset) goes back to the root query.
///
/// ```ignore
/// let mut adults = people
///     .fetch(Filter::gte("age", 18))
///     .sort("age", SortDirection::Desc)
///     .limit(10);
///
/// let total = adults.total().await?;
/// while let Some(person) = adults.next().await? {
///     println!("{:?}", person.id());
/// }
/// ```
#[derive(Debug)]
pub struct FetchResult<'a, B: StoreBackend, M: Model> {
    schema: &'static Schema,
    root: Cursor<'a, B>,
    cursor: Cursor<'a, B>,
    _model: PhantomData<fn() -> M>,
}

impl<'a, B: StoreBackend, M: Model> FetchResult<'a, B, M> {
    pub(crate) fn new(schema: &'static Schema, root: Cursor<'a, B>) -> Self {
        Self {
            schema,
            cursor: root.clone(),
            root,
            _model: PhantomData,
        }
    }

    /// Adds a sort key after those already applied.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        let mut keys = self.cursor.query().sort.clone();
        keys.push(Sort {
            field: field.into(),
            direction,
        });
        self.cursor = self.cursor.sort(keys);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.cursor = self.cursor.skip(skip);
        self
    }

    /// A limit of 0 means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.cursor = self.cursor.limit(limit);
        self
    }

    /// Restarts iteration, keeping sort, skip and limit.
    pub fn rewind(&mut self) -> &mut Self {
        self.cursor.rewind();
        self
    }

    /// Restarts iteration over the root query, dropping sort, skip and limit.
    pub fn reset(&mut self) -> &mut Self {
        self.cursor = self.root.clone();
        self
    }

    /// Number of documents matching the root query, regardless of skip and limit.
    pub async fn total(&self) -> ModelResult<u64> {
        Ok(self.root.count().await?)
    }

    /// The `index`-th model of the current window, without disturbing iteration.
    pub async fn get(&self, index: usize) -> ModelResult<Option<M>> {
        let document = self.cursor.index(index).await?;
        Ok(document.map(|document| self.materialize(document)))
    }

    pub async fn next(&mut self) -> ModelResult<Option<M>> {
        let document = self.cursor.next().await?;
        Ok(document.map(|document| self.materialize(document)))
    }

    /// Drains the remaining models.
    pub async fn all(&mut self) -> ModelResult<Vec<M>> {
        let mut models = Vec::new();
        while let Some(model) = self.next().await? {
            models.push(model);
        }
        Ok(models)
    }

    /// The remaining models as a stream.
    pub fn into_stream(self) -> impl Stream<Item = ModelResult<M>> + 'a {
        stream::try_unfold(self, |mut this| async move {
            Ok::<_, ModelError>(this.next().await?.map(|model| (model, this)))
        })
    }

    /// One page of the root query, in the current sort order.
    ///
    /// Pages are 1-indexed; `count` is the total number of matches.
    pub async fn paginate(&self, params: &PaginationParams) -> ModelResult<Page<M>> {
        let count = self.total().await? as usize;
        let offset = params.offset();

        let mut cursor = self
            .root
            .clone()
            .sort(self.cursor.query().sort.clone())
            .skip(offset)
            .limit(params.per_page);

        let mut items = Vec::new();
        while let Some(document) = cursor.next().await? {
            items.push(self.materialize(document));
        }

        let next_page = (offset.saturating_add(items.len()) < count)
            .then_some(params.page.max(1).saturating_add(1));
        let previous_page = (params.page > 1).then(|| params.page - 1);

        Ok(Page::builder(items)
            .with_count(count)
            .with_next_page(next_page)
            .with_previous_page(previous_page)
            .build())
    }

    fn materialize(&self, document: Document) -> M {
        M::from_record(Record::from_stored(self.schema, document))
    }
}
