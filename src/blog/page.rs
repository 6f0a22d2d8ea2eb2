use serde::Serialize;

/// Pagination over `item_count` items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub const DEFAULT_SIZE: u64 = 10;

    /// An index past the last page, or an empty collection, yields page 1
    /// with a zero limit.
    pub fn new(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = item_count.div_ceil(page_size);
        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count || page_index == 0 {
            (1, 0, 0)
        } else {
            (page_index, page_size * (page_index - 1), page_size)
        };
        Self {
            item_count,
            page_index,
            page_size,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    /// Parses a client-supplied page index; anything unusable reads as 1.
    pub fn index(raw: Option<&str>) -> u64 {
        raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|&i| i >= 1).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page() {
        let page = Page::new(91, 3, 10);
        assert_eq!(page.page_count, 10);
        assert_eq!((page.offset, page.limit), (20, 10));
        assert!(page.has_next && page.has_previous);
    }

    #[test]
    fn last_page() {
        let page = Page::new(91, 10, 10);
        assert_eq!((page.offset, page.limit), (90, 10));
        assert!(!page.has_next);
    }

    #[test]
    fn out_of_range_collapses_to_first() {
        for page in [Page::new(0, 1, 10), Page::new(5, 2, 10)] {
            assert_eq!(page.page_index, 1);
            assert_eq!(page.limit, 0);
            assert!(!page.has_previous);
        }
        assert_eq!(Page::new(0, 1, 10).page_count, 0);
    }

    #[test]
    fn parses_indexes() {
        assert_eq!(Page::index(Some("4")), 4);
        assert_eq!(Page::index(Some("0")), 1);
        assert_eq!(Page::index(Some("x")), 1);
        assert_eq!(Page::index(None), 1);
    }
}
