// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use serde::Serialize;

/// One page of messages plus the total number of matches.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total_count: u64,
    /// 1-based page number.
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(list: Vec<T>, total_count: u64, page: u32, size: u32) -> Self {
        Self {
            list,
            total_count,
            page,
            size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.size as u64)
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages()
    }
}

/// Offset of the first message on a 1-based page. Page 0 is treated as
/// page 1.
pub(crate) fn offset(page: u32, size: u32) -> u64 {
    page.saturating_sub(1) as u64 * size as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_page() {
        let page = Page::new(vec![1, 2, 3], 7, 1, 3);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        let page = Page::new(vec![7], 7, 3, 3);
        assert!(!page.has_next());
        let page: Page<u8> = Page::new(vec![], 0, 1, 0);
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 10), 0);
        assert_eq!(offset(0, 10), 0);
        assert_eq!(offset(3, 25), 50);
    }
}
