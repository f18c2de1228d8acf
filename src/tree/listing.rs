//! Iterators over the members of a collection.
//!
//! A listing either replays the collection's key cache or crawls the remote
//! listing. An unfiltered crawl records every key it sees and hands the set
//! back to the collection once the last page has been consumed, so a
//! listing dropped half way or cut short by an error persists nothing.

use serde_json::Value;
use std::vec;

use super::collection::{Collection, KeyEntry, KeyState};
use super::node::Node;
use super::resource::Fields;
use crate::error::Result;

pub(super) type Items<'s> = Box<dyn Iterator<Item = Result<Value>> + 's>;

enum Source<'s> {
  Cached(vec::IntoIter<KeyEntry>),
  Remote {
    items: Items<'s>,
    /// Keys seen so far, `None` when the crawl is filtered
    seen: Option<Vec<KeyEntry>>,
    state: KeyState,
  },
  Done,
}

pub(super) struct Listing<'c, 's> {
  collection: &'c mut Collection<'s>,
  source: Source<'s>,
}

impl<'c, 's> Listing<'c, 's> {
  pub(super) fn cached(collection: &'c mut Collection<'s>, keys: Vec<KeyEntry>) -> Self {
    Self {
      collection,
      source: Source::Cached(keys.into_iter()),
    }
  }

  /// `record` makes the crawl canonical: its keys replace the key cache
  /// at exhaustion, marked with `state`.
  pub(super) fn remote(
    collection: &'c mut Collection<'s>,
    items: Items<'s>,
    record: bool,
    state: KeyState,
  ) -> Self {
    Self {
      collection,
      source: Source::Remote {
        items,
        seen: record.then(Vec::new),
        state,
      },
    }
  }

  /// Next key, with the inline data it was listed with (remote only).
  fn next_entry(&mut self) -> Option<Result<(String, Option<Fields>)>> {
    match &mut self.source {
      Source::Done => None,
      Source::Cached(keys) => match keys.next() {
        Some(entry) => Some(Ok((entry.key, None))),
        None => {
          self.source = Source::Done;
          None
        }
      },
      Source::Remote { items, seen, state } => match items.next() {
        Some(Ok(item)) => {
          let key = match self.collection.key_of(&item) {
            Ok(key) => key,
            Err(e) => {
              self.source = Source::Done;
              return Some(Err(e));
            }
          };
          if let Some(seen) = seen {
            seen.push(KeyEntry {
              key: key.clone(),
              state: *state,
            });
          }
          let data = match item {
            Value::Object(fields) => Some(fields),
            _ => None,
          };
          Some(Ok((key, data)))
        }
        Some(Err(e)) => {
          self.source = Source::Done;
          Some(Err(e))
        }
        None => {
          if let Some(seen) = seen.take() {
            self.collection.store_keys(seen);
          }
          self.source = Source::Done;
          None
        }
      },
    }
  }
}

/// Keys of a collection, see [`Collection::list_keys`].
pub struct Keys<'c, 's>(pub(super) Listing<'c, 's>);

impl Iterator for Keys<'_, '_> {
  type Item = Result<String>;

  fn next(&mut self) -> Option<Self::Item> {
    self
      .0
      .next_entry()
      .map(|entry| entry.map(|(key, _)| key))
  }
}

/// Keys with their member nodes, see [`Collection::search`].
pub struct Members<'c, 's>(pub(super) Listing<'c, 's>);

impl<'s> Iterator for Members<'_, 's> {
  type Item = Result<(String, Node<'s>)>;

  fn next(&mut self) -> Option<Self::Item> {
    let (key, data) = match self.0.next_entry()? {
      Ok(entry) => entry,
      Err(e) => return Some(Err(e)),
    };

    Some(
      self
        .0
        .collection
        .member(&key, data)
        .map(|node| (key, node)),
    )
  }
}
