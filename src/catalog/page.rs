//! 分页引擎
//!
//! 纯函数切片：同一输入永远得到同一页，越界页码一律夹取而不报错。
//! 翻页时由调用方重新发起原查询，页边界随底层数据漂移是可接受的最终一致性。

use serde::{Deserialize, Serialize};

/// 一页结果：条目 + 页码导航标志，构造后不再变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 当前页码（从 0 起）
    pub index: usize,
    /// 总页数；空结果集为 0
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 将有序结果集切成固定大小的一页
///
/// 页码夹取到 `[0, total_pages-1]`；page_size 为 0 时按 1 处理；
/// 空结果集返回空页（两个导航标志均为 false）。
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page_index: usize) -> Page<T> {
    let size = page_size.max(1);
    let total_pages = items.len().div_ceil(size);
    let index = if total_pages == 0 {
        0
    } else {
        page_index.min(total_pages - 1)
    };
    let start = index * size;
    let end = (start + size).min(items.len());
    let slice = if start < items.len() {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: slice,
        index,
        total_pages,
        has_next: index + 1 < total_pages,
        has_prev: index > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: usize) -> Vec<usize> {
        (1..=n).collect()
    }

    #[test]
    fn test_first_page_of_seven() {
        let page = paginate(&seq(7), 5, 0);
        assert_eq!(page.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(page.index, 0);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_last_page_of_seven() {
        let page = paginate(&seq(7), 5, 1);
        assert_eq!(page.items, vec![6, 7]);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_out_of_range_clamps_to_last_page() {
        let page = paginate(&seq(12), 5, 999);
        assert_eq!(page.index, 2);
        assert_eq!(page.items, vec![11, 12]);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_idempotent() {
        let items = seq(12);
        let a = paginate(&items, 5, 1);
        let b = paginate(&items, 5, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_sequence() {
        let page = paginate(&Vec::<usize>::new(), 5, 3);
        assert!(page.is_empty());
        assert_eq!(page.index, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_exact_multiple_has_no_phantom_page() {
        let page = paginate(&seq(10), 5, 1);
        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next);
    }

    #[test]
    fn test_zero_page_size_treated_as_one() {
        let page = paginate(&seq(3), 0, 0);
        assert_eq!(page.items, vec![1]);
        assert_eq!(page.total_pages, 3);
    }
}
