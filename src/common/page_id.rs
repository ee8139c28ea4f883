//! Page identifier type.

use std::fmt;

/// Physical address of a page: a volume number plus a page number inside it.
///
/// A page id is stable while the page is live; the allocator never hands out
/// a page that is still in use.
///
/// # Example
/// ```
/// use slotbase::PageId;
///
/// let page_id = PageId::new(1, 42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.page_no, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// Volume the page lives on.
    pub vol_no: u16,
    /// Page number within the volume.
    pub page_no: u32,
}

impl PageId {
    /// Page number used on disk to mean "no page".
    pub const NIL_PAGE_NO: u32 = u32::MAX;

    /// Invalid/sentinel page ID.
    pub const INVALID: PageId = PageId {
        vol_no: u16::MAX,
        page_no: Self::NIL_PAGE_NO,
    };

    /// Create a new PageId.
    #[inline]
    pub fn new(vol_no: u16, page_no: u32) -> Self {
        PageId { vol_no, page_no }
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.page_no != Self::NIL_PAGE_NO
    }

    /// Build a page id on `vol_no` from an on-disk page number, mapping the
    /// nil page number to `None`.
    #[inline]
    pub fn from_raw(vol_no: u16, page_no: u32) -> Option<Self> {
        (page_no != Self::NIL_PAGE_NO).then_some(PageId { vol_no, page_no })
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Page({}:{})", self.vol_no, self.page_no)
        } else {
            write!(f, "Page(INVALID)")
        }
    }
}
