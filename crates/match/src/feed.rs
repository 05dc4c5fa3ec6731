use reckon_core::{FeedError, FeedRecord, MatchWindow};

/// One batch of records, in feed order.
pub type Page = Vec<FeedRecord>;

/// A forward-only, single-pass sequence of pages. Each item costs the
/// collaborator a round trip; asking again means calling the feed again.
pub type Pages<'a> = Box<dyn Iterator<Item = Result<Page, FeedError>> + 'a>;

/// The bank side: transactions already narrowed to a time window.
pub trait BankFeed {
    fn get_transactions(&self, window: MatchWindow, category: Option<&str>) -> Pages<'_>;
}

/// The retailer side: the full purchase history, newest first.
pub trait RetailerFeed {
    fn list_transactions(&self) -> Pages<'_>;
}

/// Keep only records inside `window` and, when given, in `category`.
pub fn narrow(page: Page, window: MatchWindow, category: Option<&str>) -> Page {
    page.into_iter()
        .filter(|r| window.contains(r.timestamp))
        .filter(|r| category.is_none() || r.category() == category)
        .collect()
}

// ── In-memory feed ────────────────────────────────────────────────────────────

/// Pages held in memory and replayed on every call.
#[derive(Debug, Clone, Default)]
pub struct PagedFeed {
    pages: Vec<Page>,
}

impl PagedFeed {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

impl BankFeed for PagedFeed {
    fn get_transactions(&self, window: MatchWindow, category: Option<&str>) -> Pages<'_> {
        let category = category.map(str::to_string);
        Box::new(
            self.pages
                .iter()
                .map(move |page| narrow(page.clone(), window, category.as_deref()))
                .filter(|page| !page.is_empty())
                .map(Ok),
        )
    }
}

impl RetailerFeed for PagedFeed {
    fn list_transactions(&self) -> Pages<'_> {
        Box::new(self.pages.iter().cloned().map(Ok))
    }
}
