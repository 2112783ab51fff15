//! Case listing filters and pagination.

use serde::{Deserialize, Serialize};

use shipline_case::{ExportCase, Stage};
use shipline_directory::CompanyId;

/// Pagination parameters for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of items to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Cut one page out of a (lazy) sequence, counting the rest.
    pub fn paginate<T, I>(self, items: I) -> Page<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut total = 0u64;
        let mut page = Vec::new();

        for (idx, item) in items.into_iter().enumerate() {
            total += 1;
            if idx >= self.offset as usize && page.len() < self.limit as usize {
                page.push(item);
            }
        }

        let has_more = u64::from(self.offset) + (page.len() as u64) < total;
        Page {
            items: page,
            total,
            pagination: self,
            has_more,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of items matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Filter criteria for case listings, mirroring the dashboards' search boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilter {
    pub stage: Option<Stage>,
    /// Company bound to any slot.
    pub assigned_company: Option<CompanyId>,
    /// Case-insensitive.
    pub buyer_country: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &ExportCase) -> bool {
        self.stage.is_none_or(|s| case.stage() == s)
            && self
                .assigned_company
                .is_none_or(|c| case.assignments().involves(c))
            && self
                .buyer_country
                .as_deref()
                .is_none_or(|country| case.buyer().is_in_country(country))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        assert_eq!(Pagination::new(Some(5000), None).limit, 1000);
        assert_eq!(Pagination::default().limit, 50);
    }

    #[test]
    fn paginate_counts_everything_and_slices_one_page() {
        let page = Pagination::new(Some(2), Some(1)).paginate(0..5);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.total, 5);
        assert!(page.has_more);

        let last = Pagination::new(Some(2), Some(4)).paginate(0..5);
        assert_eq!(last.items, vec![4]);
        assert!(!last.has_more);
    }
}
