//! Pagination requests, configuration and page-link windows.
//!
//! [`Collection::paginate`](crate::collection::Collection::paginate) turns a
//! [`PageRequest`] into a skip/limit query, resolves the total according to the
//! request's [`TotalStrategy`] and hands the resulting [`PaginationArgs`] to a
//! [`PaginationAdapter`]. Rendering is the adapter's business; the built-in
//! [`LinkWindow`] only computes which page numbers to show.
//!
//! # Example
//!
//! ```ignore
//! use docbit::page::{LinkWindow, PageRequest, TotalStrategy};
//!
//! let request = PageRequest::new(3)
//!     .per_page(20)
//!     .total(TotalStrategy::Docs);
//!
//! let page = users.paginate(query, &request, &LinkWindow).await?;
//! assert_eq!(page.skip, 40);
//! ```

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Application-wide pagination settings.
///
/// Values on a [`PageRequest`] take precedence over these.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationConfig {
    pub per_page: usize,
    pub inner_window: usize,
    pub outer_window: usize,
    pub link_size: Option<String>,
    pub link_align: Option<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            per_page: 10,
            inner_window: 2,
            outer_window: 1,
            link_size: None,
            link_align: None,
        }
    }
}

/// How the total handed to the adapter is resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TotalStrategy {
    /// Count every document of the table.
    #[default]
    All,
    /// Use the number of documents matching the query.
    Docs,
    /// Use a caller-supplied total.
    Fixed(u64),
}

/// Caller-supplied presentation text, passed to the adapter untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PageLabels {
    pub prev_label: Option<String>,
    pub next_label: Option<String>,
    pub display_msg: Option<String>,
    pub search_msg: Option<String>,
    pub record_name: Option<String>,
}

/// A request for one page of results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    per_page: Option<usize>,
    total: TotalStrategy,
    inner_window: Option<usize>,
    outer_window: Option<usize>,
    labels: PageLabels,
    search: bool,
    link_size: Option<String>,
    alignment: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PageRequest {
    /// Requests page `page` (1-indexed).
    pub fn new(page: usize) -> Self {
        Self {
            page,
            per_page: None,
            total: TotalStrategy::All,
            inner_window: None,
            outer_window: None,
            labels: PageLabels::default(),
            search: false,
            link_size: None,
            alignment: None,
        }
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn total(mut self, total: TotalStrategy) -> Self {
        self.total = total;
        self
    }

    pub fn inner_window(mut self, inner_window: usize) -> Self {
        self.inner_window = Some(inner_window);
        self
    }

    pub fn outer_window(mut self, outer_window: usize) -> Self {
        self.outer_window = Some(outer_window);
        self
    }

    pub fn labels(mut self, labels: PageLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn search(mut self, search: bool) -> Self {
        self.search = search;
        self
    }

    pub fn link_size(mut self, link_size: impl Into<String>) -> Self {
        self.link_size = Some(link_size.into());
        self
    }

    pub fn alignment(mut self, alignment: impl Into<String>) -> Self {
        self.alignment = Some(alignment.into());
        self
    }

    /// The requested page; anything below 1 is page 1.
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn total_strategy(&self) -> TotalStrategy {
        self.total
    }

    /// Page size after applying `config`. Never zero.
    pub fn resolved_per_page(&self, config: &PaginationConfig) -> usize {
        self.per_page
            .unwrap_or(config.per_page)
            .max(1)
    }

    /// Number of documents to skip for this page. Saturates for absurd page numbers.
    pub fn skip(&self, config: &PaginationConfig) -> usize {
        (self.page() - 1).saturating_mul(self.resolved_per_page(config))
    }

    /// Assembles the adapter input once the counts are known.
    pub fn to_args(&self, config: &PaginationConfig, found: u64, total: u64) -> PaginationArgs {
        PaginationArgs {
            found,
            page: self.page(),
            per_page: self.resolved_per_page(config),
            total,
            skip: self.skip(config),
            inner_window: self.inner_window.unwrap_or(config.inner_window),
            outer_window: self.outer_window.unwrap_or(config.outer_window),
            labels: self.labels.clone(),
            search: self.search,
            link_size: self
                .link_size
                .clone()
                .or_else(|| config.link_size.clone()),
            alignment: self
                .alignment
                .clone()
                .or_else(|| config.link_align.clone()),
        }
    }
}

/// Everything a pagination adapter needs to describe one page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaginationArgs {
    /// Documents matching the query, ignoring skip and limit.
    pub found: u64,
    pub page: usize,
    pub per_page: usize,
    /// Total resolved with the request's [`TotalStrategy`].
    pub total: u64,
    pub skip: usize,
    pub inner_window: usize,
    pub outer_window: usize,
    pub labels: PageLabels,
    pub search: bool,
    pub link_size: Option<String>,
    pub alignment: Option<String>,
}

impl PaginationArgs {
    /// Number of pages needed for `total` documents.
    pub fn total_pages(&self) -> usize {
        let total = usize::try_from(self.total).unwrap_or(usize::MAX);
        total.div_ceil(self.per_page.max(1))
    }
}

/// Turns page metadata into whatever the presentation layer renders.
pub trait PaginationAdapter {
    type Output;

    fn paginate(&self, args: &PaginationArgs) -> Self::Output;
}

/// One page of records together with the adapter's output.
#[derive(Debug, Clone)]
pub struct Paginated<P> {
    pub records: Vec<Record>,
    pub pagination: P,
    pub skip: usize,
}

/// Adapter computing a windowed list of page links.
///
/// The first and last `outer_window + 1` pages are always shown, as are the pages
/// within `inner_window` of the current one. Skipped runs become a single `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkWindow;

/// Output of [`LinkWindow`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    pub page: usize,
    pub total_pages: usize,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
    /// Page numbers to render; `None` marks a gap.
    pub pages: Vec<Option<usize>>,
    pub labels: PageLabels,
}

impl PaginationAdapter for LinkWindow {
    type Output = PageLinks;

    fn paginate(&self, args: &PaginationArgs) -> PageLinks {
        let total_pages = args.total_pages();
        let page = args.page;

        PageLinks {
            page,
            total_pages,
            previous_page: (page > 1).then(|| page - 1),
            next_page: (page < total_pages).then(|| page + 1),
            pages: window(page, total_pages, args.inner_window, args.outer_window),
            labels: args.labels.clone(),
        }
    }
}

fn window(page: usize, total_pages: usize, inner: usize, outer: usize) -> Vec<Option<usize>> {
    if total_pages == 0 {
        return Vec::new();
    }

    let page = page.min(total_pages);
    let mut from = page.saturating_sub(inner).max(1);
    let mut to = page.saturating_add(inner);

    if to > total_pages {
        from = from.saturating_sub(to - total_pages).max(1);
        to = total_pages;
    }
    if page <= inner {
        to = to.saturating_add(inner - page + 1).min(total_pages);
    }

    let mut visible = (1..=outer.saturating_add(1).min(total_pages))
        .chain(from..=to)
        .chain(total_pages.saturating_sub(outer).max(1)..=total_pages)
        .collect::<Vec<_>>();
    visible.sort_unstable();
    visible.dedup();

    let mut pages = Vec::with_capacity(visible.len() + 2);
    let mut last = 0;
    for number in visible {
        if last != 0 && number > last + 1 {
            pages.push(None);
        }
        pages.push(Some(number));
        last = number;
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(page: usize, total: u64) -> PageLinks {
        let args = PageRequest::new(page).to_args(&PaginationConfig::default(), total, total);
        LinkWindow.paginate(&args)
    }

    fn numbers(pages: &[Option<usize>]) -> String {
        pages
            .iter()
            .map(|page| page.map_or("..".to_string(), |n| n.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn skip_is_derived_from_page_and_size() {
        let config = PaginationConfig::default();

        assert_eq!(PageRequest::new(1).skip(&config), 0);
        assert_eq!(PageRequest::new(3).per_page(20).skip(&config), 40);
        assert_eq!(PageRequest::new(0).skip(&config), 0);
        assert_eq!(PageRequest::new(0).page(), 1);
    }

    #[test]
    fn request_values_override_config() {
        let config = PaginationConfig {
            per_page: 25,
            link_size: Some("sm".to_string()),
            link_align: Some("center".to_string()),
            ..PaginationConfig::default()
        };

        let args = PageRequest::new(2).to_args(&config, 7, 70);
        assert_eq!(args.per_page, 25);
        assert_eq!(args.skip, 25);
        assert_eq!(args.found, 7);
        assert_eq!(args.total, 70);
        assert_eq!(args.link_size.as_deref(), Some("sm"));
        assert_eq!(args.alignment.as_deref(), Some("center"));

        let args = PageRequest::new(2)
            .per_page(5)
            .inner_window(4)
            .alignment("right")
            .to_args(&config, 7, 70);
        assert_eq!(args.per_page, 5);
        assert_eq!(args.inner_window, 4);
        assert_eq!(args.outer_window, 1);
        assert_eq!(args.alignment.as_deref(), Some("right"));
    }

    #[test]
    fn labels_pass_through_untouched() {
        let labels = PageLabels {
            prev_label: Some("«".to_string()),
            record_name: Some("users".to_string()),
            ..PageLabels::default()
        };
        let args = PageRequest::new(1)
            .labels(labels.clone())
            .to_args(&PaginationConfig::default(), 0, 0);

        assert_eq!(args.labels, labels);
        assert_eq!(LinkWindow.paginate(&args).labels, labels);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PaginationConfig = serde_json::from_str(r#"{"per_page": 50}"#).unwrap();

        assert_eq!(config.per_page, 50);
        assert_eq!(config.inner_window, 2);
        assert_eq!(config.outer_window, 1);
        assert_eq!(config.link_size, None);
    }

    #[test]
    fn window_in_the_middle_has_gaps() {
        let links = links(10, 200);

        assert_eq!(links.total_pages, 20);
        assert_eq!(links.previous_page, Some(9));
        assert_eq!(links.next_page, Some(11));
        assert_eq!(numbers(&links.pages), "1 2 .. 8 9 10 11 12 .. 19 20");
    }

    #[test]
    fn window_near_the_start_merges_with_outer_pages() {
        assert_eq!(numbers(&links(5, 100).pages), "1 2 3 4 5 6 7 .. 9 10");
        assert_eq!(numbers(&links(1, 200).pages), "1 2 3 4 5 .. 19 20");
    }

    #[test]
    fn window_near_the_end() {
        let links = links(20, 200);

        assert_eq!(links.next_page, None);
        assert_eq!(numbers(&links.pages), "1 2 .. 16 17 18 19 20");
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let config = PaginationConfig::default();
        let request = PageRequest::new(usize::MAX).per_page(10);

        assert_eq!(request.skip(&config), usize::MAX);
        assert_eq!(request.to_args(&config, 3, 3).skip, usize::MAX);
        assert_eq!(PageRequest::new(3).per_page(0).skip(&config), 2);

        let links = LinkWindow.paginate(&request.to_args(&config, 25, 25));
        assert_eq!(links.previous_page, Some(usize::MAX - 1));
        assert_eq!(links.next_page, None);
        assert_eq!(numbers(&links.pages), "1 2 3");
    }

    #[test]
    fn small_and_empty_results() {
        assert_eq!(numbers(&links(1, 25).pages), "1 2 3");
        assert_eq!(links(1, 25).next_page, Some(2));

        let empty = links(1, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.pages.is_empty());
        assert_eq!(empty.previous_page, None);
        assert_eq!(empty.next_page, None);
    }
}
