//! Paginated listing
//!
//! [`ListPages`] turns the service's truncated listing pages into a lazy,
//! forward-only sequence. Each page fetch re-invokes the list execution with
//! the marker taken from the previous page, so consuming a page is the only
//! way to reach the next one.

use crate::client::S3Client;
use crate::error::S3Error;
use crate::pool::OperationKind;
use crate::types::ListPage;

/// A forward-only cursor over listing pages.
///
/// Yields pages until the final non-truncated one, then `None`. The cursor
/// fuses after the final page and after the first error; pages already
/// yielded stay valid either way. Every page fetch independently goes
/// through the cursor's operation pool.
#[derive(Debug)]
pub struct ListPages {
    client: S3Client,
    kind: OperationKind,
    prefix: String,
    delimiter: Option<String>,
    marker: Option<String>,
    finished: bool,
}

impl ListPages {
    pub(crate) fn new(
        client: S3Client,
        kind: OperationKind,
        prefix: String,
        delimiter: Option<String>,
    ) -> Self {
        Self {
            client,
            kind,
            prefix,
            delimiter,
            marker: None,
            finished: false,
        }
    }

    /// Fetch the next page, or `None` after the final page.
    pub async fn try_next(&mut self) -> Result<Option<ListPage>, S3Error> {
        if self.finished {
            return Ok(None);
        }

        let page = match self
            .client
            .fetch_list_page(
                self.kind,
                &self.prefix,
                self.delimiter.as_deref(),
                self.marker.as_deref(),
            )
            .await
        {
            Ok(page) => page,
            Err(err) => {
                self.finished = true;
                return Err(err);
            }
        };

        if page.truncated {
            match &page.continuation_key {
                Some(key) => self.marker = Some(key.clone()),
                // A truncated page without a marker cannot be continued.
                None => self.finished = true,
            }
        } else {
            self.finished = true;
        }

        Ok(Some(page))
    }
}
