//! Sled-backed record store
//!
//! Every collection is its own tree and every record its own key, so writers
//! touching different records never contend. Values are CBOR.
use super::error::{Result, StorefrontError};
use sled::{CompareAndSwapError, Db, Tree};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct Store {
    instance: Arc<Db>,
    pub(crate) products: Tree,
    pub(crate) orders: Tree,
    pub(crate) orders_by_customer: Tree,
    pub(crate) users: Tree,
    pub(crate) sessions: Tree,
    pub(crate) blobs: Tree,
}

impl Store {
    pub fn new(instance: Arc<Db>) -> Result<Self> {
        Ok(Self {
            products: instance.open_tree("products")?,
            orders: instance.open_tree("orders")?,
            orders_by_customer: instance.open_tree("orders_by_customer")?,
            users: instance.open_tree("users")?,
            sessions: instance.open_tree("sessions")?,
            blobs: instance.open_tree("blobs")?,
            instance,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Arc::new(sled::open(path)?))
    }

    pub async fn flush(&self) -> Result<usize> {
        Ok(self.instance.flush_async().await?)
    }
}

pub(crate) fn get_record<T>(tree: &Tree, key: impl AsRef<[u8]>) -> Result<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(key)? {
        Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Inserts only if the key is vacant.
pub(crate) fn insert_new_record<T>(tree: &Tree, key: &[u8], record: &T) -> Result<()>
where
    T: minicbor::Encode<()>,
{
    let bytes = minicbor::to_vec(record)?;
    match tree.compare_and_swap(key, None as Option<&[u8]>, Some(bytes))? {
        Ok(()) => Ok(()),
        Err(CompareAndSwapError { .. }) => Err(StorefrontError::Conflict(
            "a record with this key already exists".into(),
        )),
    }
}

/// Decodes every value in key order.
pub(crate) fn scan_records<T>(tree: &Tree) -> Result<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.iter()
        .values()
        .map(|value| -> Result<T> { Ok(minicbor::decode(&value?)?) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(minicbor::Encode, minicbor::Decode, Debug, PartialEq)]
    struct Note {
        #[n(0)]
        body: String,
    }

    #[test]
    fn vacant_insert_refuses_to_overwrite() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let store = Store::open(temp_dir.path().join("store.db"))?;

        let first = Note { body: "first".into() };
        insert_new_record(&store.products, b"k", &first)?;
        let clash = insert_new_record(&store.products, b"k", &Note { body: "second".into() });

        assert!(matches!(clash, Err(StorefrontError::Conflict(_))));
        assert_eq!(get_record::<Note>(&store.products, b"k")?, Some(first));
        Ok(())
    }

    #[test]
    fn scan_returns_records_in_key_order() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let store = Store::open(temp_dir.path().join("store.db"))?;

        insert_new_record(&store.orders, b"b", &Note { body: "2".into() })?;
        insert_new_record(&store.orders, b"a", &Note { body: "1".into() })?;

        let notes: Vec<Note> = scan_records(&store.orders)?;
        let bodies: Vec<_> = notes.into_iter().map(|n| n.body).collect();
        assert_eq!(bodies, vec!["1", "2"]);
        Ok(())
    }
}
