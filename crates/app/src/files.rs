//! Feeds and receipts read from exported JSON responses on disk.
//!
//! ```text
//! <root>/retailer/*.json        activity-feed pages
//! <root>/bank/*.json            transaction list pages
//! <root>/receipts/<key>.json    receipt detail responses
//! ```
//!
//! Pages are replayed in file-name order. Receipt keys may contain `/`,
//! which is stored as `_` in the file name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use reckon_core::{FeedError, MatchWindow};
use reckon_match::{narrow, BankFeed, BankPage, Page, Pages, RetailerDecoder, RetailerFeed};
use reckon_receipt::{RawReceipt, ReceiptSource};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    decoder: RetailerDecoder,
}

impl DataDir {
    pub fn new(root: &Path, decoder: RetailerDecoder) -> Self {
        Self {
            root: root.to_path_buf(),
            decoder,
        }
    }

    fn page_files(&self, section: &str) -> Result<Vec<PathBuf>, FeedError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.root.join(section))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Pages are read one file at a time as the caller pulls them.
    fn pages<'a, F>(&'a self, section: &str, decode: F) -> Pages<'a>
    where
        F: Fn(&str) -> Result<Page, FeedError> + 'a,
    {
        match self.page_files(section) {
            Ok(files) => Box::new(files.into_iter().map(move |path| {
                tracing::debug!(path = %path.display(), "reading page");
                decode(&fs::read_to_string(&path)?)
            })),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn receipt_path(&self, receipt_key: &str) -> PathBuf {
        self.root
            .join("receipts")
            .join(format!("{}.json", receipt_key.replace('/', "_")))
    }
}

impl RetailerFeed for DataDir {
    fn list_transactions(&self) -> Pages<'_> {
        self.pages("retailer", move |text| {
            Ok(self.decoder.decode_page(serde_json::from_str(text)?)?.records)
        })
    }
}

impl BankFeed for DataDir {
    fn get_transactions(&self, window: MatchWindow, category: Option<&str>) -> Pages<'_> {
        let category = category.map(str::to_string);
        Box::new(
            self.pages("bank", |text| Ok(BankPage::from_json(text)?.records))
                .map(move |page| page.map(|p| narrow(p, window, category.as_deref())))
                .filter(|page| !matches!(page, Ok(p) if p.is_empty())),
        )
    }
}

impl ReceiptSource for DataDir {
    fn fetch_receipt(&self, receipt_key: &str) -> Result<RawReceipt, FeedError> {
        let text = match fs::read_to_string(self.receipt_path(receipt_key)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FeedError::UnknownReceipt(receipt_key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        RawReceipt::from_json(&text).map_err(|e| FeedError::Record {
            id: receipt_key.to_string(),
            reason: e.to_string(),
        })
    }
}
