//! Lazy crawl over paginated list endpoints.
//!
//! GitHub splits long listings into pages and announces the next one in the
//! `Link` response header. [`PageCrawler`] turns that into a single iterator
//! of items that only requests a page once the consumer gets there.

use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Method, Response, Transport};

/// Relation GitHub uses for the following page.
pub const NEXT: &str = "next";
/// Relation GitHub uses for the final page.
pub const LAST: &str = "last";

/// Iterator over every element of every page of a listing.
///
/// Query parameters are sent with the first request only, since link
/// targets already carry them. Any failing page ends the iteration with a
/// single [`Error::PageCrawlFailed`].
pub struct PageCrawler<'t> {
  transport: &'t dyn Transport,
  method: Method,
  rel: String,
  query: Vec<(String, String)>,
  next: Option<String>,
  buffer: VecDeque<Value>,
  pages: usize,
}

impl<'t> PageCrawler<'t> {
  pub fn new(transport: &'t dyn Transport, path: impl Into<String>) -> Self {
    Self {
      transport,
      method: Method::Get,
      rel: NEXT.to_string(),
      query: Vec::new(),
      next: Some(path.into()),
      buffer: VecDeque::new(),
      pages: 0,
    }
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
    self.query = query;
    self
  }

  /// Follow a relation other than `next`.
  pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
    self.rel = rel.into();
    self
  }

  /// Number of pages requested so far.
  pub fn pages_fetched(&self) -> usize {
    self.pages
  }

  fn fetch_page(&mut self, path: String) -> Result<()> {
    let query = if self.pages == 0 {
      std::mem::take(&mut self.query)
    } else {
      Vec::new()
    };

    let response = self.transport.call(self.method, &path, None, &query)?;
    self.pages += 1;

    if !response.is_success() {
      return Err(crawl_failed(&path, &response, response.message()));
    }

    let next = response.link(&self.rel);
    let items = match response.body {
      Value::Array(items) => items,
      _ => {
        return Err(crawl_failed(
          &path,
          &response,
          "expected a JSON array".to_string(),
        ))
      }
    };

    debug!(
      "page {} of {}: {} item(s)",
      self.pages,
      path,
      items.len()
    );

    self.next = next;
    self.buffer.extend(items);
    Ok(())
  }
}

fn crawl_failed(path: &str, response: &Response, message: String) -> Error {
  Error::PageCrawlFailed {
    path: path.to_string(),
    status: response.status,
    message,
  }
}

impl Iterator for PageCrawler<'_> {
  type Item = Result<Value>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(item) = self.buffer.pop_front() {
        return Some(Ok(item));
      }

      let path = self.next.take()?;
      if let Err(e) = self.fetch_page(path) {
        return Some(Err(e));
      }
    }
  }
}

/// Count the items of a listing without crawling it.
///
/// Requests a single one-item page; the page number of the `last` link is
/// then the item count. Without such a link the listing fits on that page.
pub fn count_items(
  transport: &dyn Transport,
  path: &str,
  query: &[(String, String)],
) -> Result<usize> {
  let mut query = query.to_vec();
  query.push(("per_page".to_string(), "1".to_string()));

  let response = transport.call(Method::Get, path, None, &query)?;
  if !response.is_success() {
    return Err(crawl_failed(path, &response, response.message()));
  }

  if let Some(page) = response.link(LAST).as_deref().and_then(page_number) {
    return Ok(page);
  }

  Ok(response.body.as_array().map(Vec::len).unwrap_or(0))
}

/// Value of the `page` query parameter of a link target.
fn page_number(link: &str) -> Option<usize> {
  let url = Url::parse(link)
    .or_else(|_| Url::parse("http://localhost").and_then(|base| base.join(link)))
    .ok()?;

  url
    .query_pairs()
    .find(|(k, _)| k == "page")
    .and_then(|(_, v)| v.parse().ok())
}
