/*
    page.rs - Cursor paging over prefix scans

    A page token is the part of the last returned key that follows the scan
    prefix. Resuming with it continues strictly after (or before, in reverse)
    that key.
*/

use crate::core_store::model::Message;
use crate::core_store::store::errors::{StoreError, StoreResult};

/// Hard cap on page size
pub const PAGE_SIZE_MAX: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Defaults to and is clamped by the store's maximum
    pub page_size: Option<usize>,
    pub page_token: Option<Vec<u8>>,
    pub reverse: bool,
}

impl PageOptions {
    pub fn with_size(page_size: usize) -> Self {
        PageOptions { page_size: Some(page_size), ..Default::default() }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn after(mut self, token: Option<Vec<u8>>) -> Self {
        self.page_token = token;
        self
    }

    /// Effective size: at least 1, at most `max`
    pub fn effective_size(&self, max: usize) -> usize {
        self.page_size.unwrap_or(max).clamp(1, max.max(1))
    }

    /// Full key to resume after, checking the token has `token_len` bytes
    pub(crate) fn start_key(&self, prefix: &[u8], token_len: usize) -> StoreResult<Option<Vec<u8>>> {
        match &self.page_token {
            None => Ok(None),
            Some(token) if token.len() != token_len => Err(StoreError::InvalidArgument(format!(
                "page token must be {} bytes, got {}",
                token_len,
                token.len()
            ))),
            Some(token) => {
                let mut key = prefix.to_vec();
                key.extend_from_slice(token);
                Ok(Some(key))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    /// Present when more rows may follow
    pub next_page_token: Option<Vec<u8>>,
}

impl MessagesPage {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
