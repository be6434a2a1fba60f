//! Page-number window
//!
//! The finite list of page indicators (numbers and ellipses) shown under the
//! result grid. The window always contains page 1, the last page, and the
//! current page with its immediate neighbors; a gap of exactly one page is
//! filled with that page's number, a wider gap collapses to one ellipsis.

use std::collections::BTreeSet;
use std::fmt;

/// One indicator in the pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Page(n) => write!(f, "{}", n),
            PageToken::Ellipsis => write!(f, "..."),
        }
    }
}

/// Out-of-range input to [`pagination_window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid pagination window: page {current_page} of {total_pages}")]
pub struct InvalidPageError {
    pub current_page: u32,
    pub total_pages: u32,
}

/// Compute the window of page indicators for `current_page` of `total_pages`.
///
/// Requires `1 <= current_page <= total_pages`; anything else is an
/// [`InvalidPageError`] rather than a nonsensical window.
///
/// ```
/// use textswap_client::query::pagination_window;
///
/// let window = pagination_window(5, 10).unwrap();
/// let rendered: Vec<String> = window.iter().map(|t| t.to_string()).collect();
/// assert_eq!(rendered, ["1", "...", "4", "5", "6", "...", "10"]);
/// ```
pub fn pagination_window(
    current_page: u32,
    total_pages: u32,
) -> Result<Vec<PageToken>, InvalidPageError> {
    if current_page < 1 || total_pages < 1 || current_page > total_pages {
        return Err(InvalidPageError {
            current_page,
            total_pages,
        });
    }

    let current = i64::from(current_page);
    let total = i64::from(total_pages);

    let mut pages: BTreeSet<i64> = BTreeSet::new();
    pages.insert(1);
    pages.insert(total);
    for page in current - 1..=current + 1 {
        if (1..=total).contains(&page) {
            pages.insert(page);
        }
    }

    // A gap of exactly one page shows the number instead of an ellipsis
    let window_first = (current - 1).max(1);
    let window_last = (current + 1).min(total);
    if window_first <= 3 && 2 <= total {
        pages.insert(2);
    }
    if window_last >= total - 2 && total - 1 >= 1 {
        pages.insert(total - 1);
    }

    let mut tokens = Vec::with_capacity(pages.len() + 2);
    let mut previous: Option<i64> = None;
    for page in pages {
        if let Some(prev) = previous {
            if page - prev > 1 {
                tokens.push(PageToken::Ellipsis);
            }
        }
        tokens.push(PageToken::Page(page as u32));
        previous = Some(page);
    }
    Ok(tokens)
}
