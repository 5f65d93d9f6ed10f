//! Typed store bound to one entity/record pair
//!
//! [`Store`] maps domain entities to records and back with caller-supplied
//! functions, eagerly loads a fixed set of relations, and runs the same hook
//! lists on every write. The record's not-found signal is replaced by the
//! caller's own not-found error.

use crate::errors::StoreError;
use crate::handle::Handle;
use crate::hooks::SharedHook;
use crate::ops;
use crate::record::Record;
use errs::BoxError;
use sqlx::{Encode, PgPool, Postgres, Type};
use std::fmt;
use std::sync::Arc;

type FromEntityFn<E, M> = Arc<dyn Fn(&E) -> Result<M, BoxError> + Send + Sync>;
type ToEntityFn<M, E> = Arc<dyn Fn(M) -> Result<E, BoxError> + Send + Sync>;
type NotFoundFn<Error> = Arc<dyn Fn() -> Error + Send + Sync>;

/// Hook lists run by [`Store`] writes.
///
/// `before_save` / `after_save` run for both create and update.
pub struct StoreHooks<M: Record> {
    pub before_save: Vec<SharedHook<M>>,
    pub after_save: Vec<SharedHook<M>>,
    pub before_delete: Vec<SharedHook<M>>,
    pub after_delete: Vec<SharedHook<M>>,
}

impl<M: Record> Default for StoreHooks<M> {
    fn default() -> Self {
        Self {
            before_save: Vec::new(),
            after_save: Vec::new(),
            before_delete: Vec::new(),
            after_delete: Vec::new(),
        }
    }
}

impl<M: Record> Clone for StoreHooks<M> {
    fn clone(&self) -> Self {
        Self {
            before_save: self.before_save.clone(),
            after_save: self.after_save.clone(),
            before_delete: self.before_delete.clone(),
            after_delete: self.after_delete.clone(),
        }
    }
}

/// Store of entities `E` persisted as records `M`, failing with `Error`.
///
/// ```rust,ignore
/// let store = Store::new(
///     pool.clone(),
///     |user: &User| Ok(UserRow { id: user.id, name: user.name.clone() }),
///     |row: UserRow| Ok(User { id: row.id, name: row.name }),
///     || AppError::UserNotFound,
/// )
/// .with_relations(["addresses"])
/// .with_hooks(StoreHooks {
///     before_save: vec![timestamps(true)],
///     ..StoreHooks::default()
/// });
///
/// let user = store.find_by_id(user_id).await?;
/// ```
pub struct Store<E, M: Record, Error> {
    pool: PgPool,
    from_entity: FromEntityFn<E, M>,
    to_entity: ToEntityFn<M, E>,
    not_found: NotFoundFn<Error>,
    relations: Vec<String>,
    hooks: StoreHooks<M>,
}

impl<E, M: Record, Error> Clone for Store<E, M, Error> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            from_entity: Arc::clone(&self.from_entity),
            to_entity: Arc::clone(&self.to_entity),
            not_found: Arc::clone(&self.not_found),
            relations: self.relations.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<E, M: Record, Error> fmt::Debug for Store<E, M, Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("table", &M::table_name())
            .field("relations", &self.relations)
            .field("before_save", &self.hooks.before_save.len())
            .field("after_save", &self.hooks.after_save.len())
            .field("before_delete", &self.hooks.before_delete.len())
            .field("after_delete", &self.hooks.after_delete.len())
            .finish()
    }
}

impl<E, M, Error> Store<E, M, Error>
where
    M: Record,
    Error: From<StoreError>,
{
    pub fn new(
        pool: PgPool,
        from_entity: impl Fn(&E) -> Result<M, BoxError> + Send + Sync + 'static,
        to_entity: impl Fn(M) -> Result<E, BoxError> + Send + Sync + 'static,
        not_found: impl Fn() -> Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            pool,
            from_entity: Arc::new(from_entity),
            to_entity: Arc::new(to_entity),
            not_found: Arc::new(not_found),
            relations: Vec::new(),
            hooks: StoreHooks::default(),
        }
    }

    /// Relations loaded with every read, in order.
    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hooks(mut self, hooks: StoreHooks<M>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run operations against `handle` instead of the store's pool, e.g. an
    /// open transaction.
    pub fn with<'a>(&'a self, handle: impl Into<Handle<'a>>) -> ScopedStore<'a, E, M, Error> {
        ScopedStore {
            store: self,
            handle: handle.into(),
        }
    }

    pub async fn find(&self) -> Result<Vec<E>, Error> {
        self.with(&self.pool).find().await
    }

    pub async fn find_by_id<'q, V>(&self, id: V) -> Result<E, Error>
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.with(&self.pool).find_by_id(id).await
    }

    pub async fn find_by_id_for_update<'q, V>(&self, id: V, skip_locked: bool) -> Result<E, Error>
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        self.with(&self.pool)
            .find_by_id_for_update(id, skip_locked)
            .await
    }

    pub async fn create(&self, entity: &E) -> Result<(), Error> {
        self.with(&self.pool).create(entity).await
    }

    pub async fn update(&self, entity: &E) -> Result<(), Error> {
        self.with(&self.pool).update(entity).await
    }

    pub async fn delete(&self, entity: &E) -> Result<(), Error> {
        self.with(&self.pool).delete(entity).await
    }

    fn from_entity(&self, entity: &E) -> Result<M, Error> {
        (self.from_entity)(entity).map_err(|source| {
            Error::from(StoreError::Mapping {
                direction: "model from entity",
                source,
            })
        })
    }

    fn to_entity(&self, record: M) -> Result<E, Error> {
        (self.to_entity)(record).map_err(|source| {
            Error::from(StoreError::Mapping {
                direction: "model to entity",
                source,
            })
        })
    }

    /// Not-found signal becomes the store's not-found error.
    fn found(&self, result: Result<M, StoreError>) -> Result<E, Error> {
        match result {
            Ok(record) => self.to_entity(record),
            Err(e) if e.is_not_found() => Err((self.not_found)()),
            Err(e) => Err(Error::from(e.context("finding model"))),
        }
    }
}

/// [`Store`] operations bound to one handle.
pub struct ScopedStore<'a, E, M: Record, Error> {
    store: &'a Store<E, M, Error>,
    handle: Handle<'a>,
}

impl<E, M, Error> ScopedStore<'_, E, M, Error>
where
    M: Record,
    Error: From<StoreError>,
{
    pub async fn find(&mut self) -> Result<Vec<E>, Error> {
        let relations = &self.store.relations;
        let records = ops::find::<M, _>(self.handle.reborrow(), |q| {
            for relation in relations {
                q.relation(relation);
            }
        })
        .await
        .map_err(|e| Error::from(e.context("finding model")))?;

        records
            .into_iter()
            .map(|record| self.store.to_entity(record))
            .collect()
    }

    pub async fn find_by_id<'q, V>(&mut self, id: V) -> Result<E, Error>
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        let relations = &self.store.relations;
        let result = ops::find_by_id::<M, _, _>(self.handle.reborrow(), id, |q| {
            for relation in relations {
                q.relation(relation);
            }
        })
        .await;
        self.store.found(result)
    }

    pub async fn find_by_id_for_update<'q, V>(&mut self, id: V, skip_locked: bool) -> Result<E, Error>
    where
        V: 'q + Encode<'q, Postgres> + Type<Postgres> + Send,
    {
        let relations = &self.store.relations;
        let result =
            ops::find_by_id_for_update::<M, _, _>(self.handle.reborrow(), id, skip_locked, |q| {
                for relation in relations {
                    q.relation(relation);
                }
            })
            .await;
        self.store.found(result)
    }

    pub async fn create(&mut self, entity: &E) -> Result<(), Error> {
        let mut record = self.store.from_entity(entity)?;
        let hooks = &self.store.hooks;
        ops::create(
            self.handle.reborrow(),
            &mut record,
            &hooks.before_save,
            &hooks.after_save,
        )
        .await
        .map_err(|e| Error::from(e.context("creating model")))
    }

    /// Fails with the store's not-found error when the record does not exist.
    pub async fn update(&mut self, entity: &E) -> Result<(), Error> {
        let mut record = self.store.from_entity(entity)?;
        let hooks = &self.store.hooks;
        match ops::update(
            self.handle.reborrow(),
            &mut record,
            &hooks.before_save,
            &hooks.after_save,
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_update_not_exists() => Err((self.store.not_found)()),
            Err(e) => Err(Error::from(e.context("updating model"))),
        }
    }

    pub async fn delete(&mut self, entity: &E) -> Result<(), Error> {
        let mut record = self.store.from_entity(entity)?;
        let hooks = &self.store.hooks;
        ops::delete(
            self.handle.reborrow(),
            &mut record,
            None,
            &hooks.before_delete,
            &hooks.after_delete,
        )
        .await
        .map_err(|e| Error::from(e.context("deleting model")))
    }
}
