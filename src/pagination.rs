use crate::twitter::FollowerSource;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

/// Why a follower stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The API stopped offering a new cursor
    Exhausted,
    /// A page came back with no users
    EmptyBatch,
}

/// Pull-based, single-pass sequence of follower batches for one account.
///
/// Each call to [`FollowerBatches::next_batch`] fetches one page. The sequence
/// ends (`Ok(None)`) on an empty page, or after the page that carried no usable
/// next cursor. After an error it yields nothing more.
pub struct FollowerBatches<'a, S: FollowerSource + ?Sized> {
    source: &'a S,
    account_id: String,
    cursor: Option<String>,
    pages: u64,
    end: Option<StreamEnd>,
    failed: bool,
}

impl<'a, S: FollowerSource + ?Sized> FollowerBatches<'a, S> {
    pub fn new(source: &'a S, account_id: &str) -> Self {
        Self {
            source,
            account_id: account_id.to_string(),
            cursor: None,
            pages: 0,
            end: None,
            failed: false,
        }
    }

    /// Fetches the next batch, or `None` once the sequence has ended
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Value>>> {
        if self.end.is_some() || self.failed {
            return Ok(None);
        }

        let page_number = self.pages + 1;
        let page = match self
            .source
            .fetch_followers_page(&self.account_id, self.cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.failed = true;
                return Err(e).with_context(|| {
                    format!(
                        "Failed to fetch followers page {page_number} for account {account_id}",
                        account_id = self.account_id
                    )
                });
            }
        };
        self.pages = page_number;

        if page.users.is_empty() {
            debug!("Page {page_number} returned no users, stopping");
            self.end = Some(StreamEnd::EmptyBatch);
            return Ok(None);
        }

        match page.next_cursor {
            Some(next)
                if !is_terminal_cursor(&next) && self.cursor.as_deref() != Some(next.as_str()) =>
            {
                self.cursor = Some(next);
            }
            other => {
                debug!("Page {page_number} ended pagination (cursor: {other:?})");
                self.end = Some(StreamEnd::Exhausted);
            }
        }

        Ok(Some(page.users))
    }

    /// How the sequence ended, if it has
    pub fn end(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Pages fetched so far, including a final empty one
    pub fn pages(&self) -> u64 {
        self.pages
    }
}

// The API signals the last page with a cursor whose leading segment is zero
fn is_terminal_cursor(cursor: &str) -> bool {
    cursor.is_empty() || cursor == "0" || cursor.starts_with("0|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::{AccountSummary, FollowerPage};
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves scripted pages and records the cursors it was asked for
    struct ScriptedPages {
        pages: Mutex<Vec<Result<FollowerPage, String>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Result<FollowerPage, String>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FollowerSource for ScriptedPages {
        async fn lookup_user(&self, _username: &str) -> Result<AccountSummary> {
            bail!("not used")
        }

        async fn fetch_followers_page(
            &self,
            _account_id: &str,
            cursor: Option<&str>,
        ) -> Result<FollowerPage> {
            self.cursors.lock().unwrap().push(cursor.map(str::to_string));
            match self.pages.lock().unwrap().pop() {
                Some(Ok(page)) => Ok(page),
                Some(Err(message)) => bail!(message),
                None => panic!("requested more pages than scripted"),
            }
        }
    }

    fn page(ids: &[&str], next_cursor: Option<&str>) -> Result<FollowerPage, String> {
        Ok(FollowerPage {
            users: ids.iter().map(|id| json!({ "rest_id": id })).collect(),
            next_cursor: next_cursor.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_follows_cursors_until_exhausted() {
        let source = ScriptedPages::new(vec![
            page(&["1", "2"], Some("100|a")),
            page(&["3"], Some("200|b")),
            page(&["4"], Some("0|c")),
        ]);
        let mut batches = FollowerBatches::new(&source, "42");

        assert_eq!(batches.next_batch().await.unwrap().unwrap().len(), 2);
        assert_eq!(batches.next_batch().await.unwrap().unwrap().len(), 1);
        assert_eq!(batches.next_batch().await.unwrap().unwrap().len(), 1);
        assert!(batches.next_batch().await.unwrap().is_none());

        assert_eq!(batches.end(), Some(StreamEnd::Exhausted));
        assert_eq!(batches.pages(), 3);
        assert_eq!(
            source.cursors(),
            vec![None, Some("100|a".to_string()), Some("200|b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_ends_stream() {
        let source = ScriptedPages::new(vec![page(&["1"], Some("100|a")), page(&[], Some("200|b"))]);
        let mut batches = FollowerBatches::new(&source, "42");

        assert!(batches.next_batch().await.unwrap().is_some());
        assert!(batches.next_batch().await.unwrap().is_none());
        assert!(batches.next_batch().await.unwrap().is_none());

        assert_eq!(batches.end(), Some(StreamEnd::EmptyBatch));
        assert_eq!(source.cursors().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_or_repeated_cursor_ends_stream() {
        let source = ScriptedPages::new(vec![page(&["1"], None)]);
        let mut batches = FollowerBatches::new(&source, "42");
        assert!(batches.next_batch().await.unwrap().is_some());
        assert!(batches.next_batch().await.unwrap().is_none());
        assert_eq!(batches.end(), Some(StreamEnd::Exhausted));

        let source = ScriptedPages::new(vec![
            page(&["1"], Some("100|a")),
            page(&["2"], Some("100|a")),
        ]);
        let mut batches = FollowerBatches::new(&source, "42");
        assert!(batches.next_batch().await.unwrap().is_some());
        assert!(batches.next_batch().await.unwrap().is_some());
        assert!(batches.next_batch().await.unwrap().is_none());
        assert_eq!(batches.end(), Some(StreamEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_error_is_reported_once() {
        let source = ScriptedPages::new(vec![
            page(&["1"], Some("100|a")),
            Err("connection reset".to_string()),
        ]);
        let mut batches = FollowerBatches::new(&source, "42");

        assert!(batches.next_batch().await.unwrap().is_some());
        let err = batches.next_batch().await.unwrap_err();
        assert!(format!("{err:#}").contains("connection reset"));
        assert!(err.to_string().contains("page 2"));

        assert!(batches.next_batch().await.unwrap().is_none());
        assert_eq!(batches.end(), None);
    }

    #[test]
    fn test_terminal_cursors() {
        assert!(is_terminal_cursor(""));
        assert!(is_terminal_cursor("0"));
        assert!(is_terminal_cursor("0|1700000000000"));
        assert!(!is_terminal_cursor("1700000000|1234"));
    }
}
