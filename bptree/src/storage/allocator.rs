//! Page allocator using a free list threaded through unused pages.
//!
//! Page 0 holds the tree header. Every other page below `next_page_id` is
//! either a live node or a free page; free pages form a singly-linked list
//! whose head lives in the header. When the list runs dry the backing store
//! grows by a batch of pages, which are threaded into a fresh list.

use tracing::{debug, trace};

use crate::storage::header::{HeaderError, TreeHeader};
use crate::storage::io::{PageStore, StoreError};
use crate::storage::page::{
    NULL_PAGE, PAGE_SIZE, PAGE_SIZE_U64, PageBytes, PageHeader, PageId, PageType, page_range,
};

/// Pages added to the file each time the free list is exhausted.
pub const DEFAULT_GROWTH_BATCH: u64 = 1024;

/// Owner of the page store and the tree header.
///
/// All page access goes through `page` and `page_mut`, which validate the
/// page id against `next_page_id`. Slices returned by them borrow the
/// allocator, so they cannot be held across `allocate`, which may remap the
/// store.
#[derive(Debug)]
pub struct PageAllocator<S: PageStore> {
    store: S,
    header: TreeHeader,
    growth_batch: u64,
}

impl<S: PageStore> PageAllocator<S> {
    /// Open an allocator over `store`.
    ///
    /// An empty store is bootstrapped with a fresh header. A non-empty store
    /// must start with a valid header and be long enough to hold every page
    /// the header accounts for.
    pub fn open(mut store: S, growth_batch: u64) -> Result<Self, AllocatorError> {
        let size = store.size();
        let header = if size == 0 {
            store.resize(PAGE_SIZE_U64)?;
            let header = TreeHeader::new();
            header.write_to_page(&mut store.bytes_mut()[..PAGE_SIZE]);
            debug!("bootstrapped empty tree file");
            header
        } else {
            if size < PAGE_SIZE_U64 {
                return Err(HeaderError::Truncated {
                    file_size: size,
                    expected: PAGE_SIZE_U64,
                }
                .into());
            }
            let header = TreeHeader::from_page(&store.bytes()[..PAGE_SIZE])?;
            let required = header.next_page_id.saturating_mul(PAGE_SIZE_U64);
            if size < required {
                return Err(HeaderError::Truncated {
                    file_size: size,
                    expected: required,
                }
                .into());
            }
            debug!(
                root = header.root_page,
                height = header.height,
                keys = header.key_count,
                next_page_id = header.next_page_id,
                "opened existing tree file"
            );
            header
        };

        Ok(Self {
            store,
            header,
            growth_batch: growth_batch.max(1),
        })
    }

    /// Current tree header.
    #[must_use]
    pub const fn header(&self) -> &TreeHeader {
        &self.header
    }

    /// Apply `f` to the header and write the result through to page 0.
    pub fn update_header(&mut self, f: impl FnOnce(&mut TreeHeader)) {
        f(&mut self.header);
        let header = self.header;
        header.write_to_page(&mut self.store.bytes_mut()[..PAGE_SIZE]);
    }

    /// Number of pages added per growth step.
    #[must_use]
    pub const fn growth_batch(&self) -> u64 {
        self.growth_batch
    }

    /// Take a page off the free list, growing the file first if needed.
    ///
    /// The returned page is zeroed and counted as a live node.
    pub fn allocate(&mut self) -> Result<PageId, AllocatorError> {
        if self.header.free_list_head == NULL_PAGE {
            self.grow(self.growth_batch)?;
        }

        let page_id = self.header.free_list_head;
        let next_page_id = self.header.next_page_id;
        let page = self.page_mut(page_id)?;
        if PageHeader::page_type(page) != Ok(PageType::Free) {
            return Err(AllocatorError::CorruptFreeList { page_id });
        }
        let next_free = page.read_u64(PageHeader::NEXT_FREE_OFFSET);
        if next_free != NULL_PAGE && (next_free == 0 || next_free >= next_page_id) {
            return Err(AllocatorError::CorruptFreeList { page_id });
        }
        page.fill(0);

        self.update_header(|h| {
            h.free_list_head = next_free;
            h.node_count += 1;
        });
        trace!(page_id, "allocated page");
        Ok(page_id)
    }

    /// Return a live page to the free list.
    pub fn free(&mut self, page_id: PageId) -> Result<(), AllocatorError> {
        let head = self.header.free_list_head;
        let page = self.page_mut(page_id)?;
        if PageHeader::page_type(page) == Ok(PageType::Free) {
            return Err(AllocatorError::DoubleFree(page_id));
        }
        page.fill(0);
        page[PageHeader::TYPE_OFFSET] = PageType::Free as u8;
        page.write_u64(PageHeader::NEXT_FREE_OFFSET, head);

        self.update_header(|h| {
            h.free_list_head = page_id;
            h.node_count = h.node_count.saturating_sub(1);
        });
        trace!(page_id, "freed page");
        Ok(())
    }

    /// Extend the file by `count` pages and push them onto the free list.
    fn grow(&mut self, count: u64) -> Result<(), AllocatorError> {
        let start = self.header.next_page_id;
        let end = start
            .checked_add(count)
            .ok_or(AllocatorError::AddressSpaceExhausted)?;
        let new_size = end
            .checked_mul(PAGE_SIZE_U64)
            .ok_or(AllocatorError::AddressSpaceExhausted)?;

        // A previous growth may have extended the file without recording it.
        if new_size > self.store.size() {
            self.store.resize(new_size)?;
        }

        let old_head = self.header.free_list_head;
        let bytes = self.store.bytes_mut();
        for page_id in start..end {
            let page = &mut bytes[page_range(page_id)];
            page.fill(0);
            page[PageHeader::TYPE_OFFSET] = PageType::Free as u8;
            let next = if page_id + 1 < end { page_id + 1 } else { old_head };
            page.write_u64(PageHeader::NEXT_FREE_OFFSET, next);
        }

        self.update_header(|h| {
            h.next_page_id = end;
            h.free_list_head = start;
        });
        debug!(
            from = start,
            to = end,
            file_size = new_size,
            "grew tree file"
        );
        Ok(())
    }

    const fn check_range(&self, page_id: PageId) -> Result<(), AllocatorError> {
        if page_id == 0 || page_id >= self.header.next_page_id {
            return Err(AllocatorError::PageOutOfRange {
                page_id,
                next_page_id: self.header.next_page_id,
            });
        }
        Ok(())
    }

    /// Bytes of a node or free page.
    pub fn page(&self, page_id: PageId) -> Result<&[u8], AllocatorError> {
        self.check_range(page_id)?;
        Ok(&self.store.bytes()[page_range(page_id)])
    }

    /// Mutable bytes of a node or free page.
    pub fn page_mut(&mut self, page_id: PageId) -> Result<&mut [u8], AllocatorError> {
        self.check_range(page_id)?;
        Ok(&mut self.store.bytes_mut()[page_range(page_id)])
    }

    /// Length of the free list.
    ///
    /// Fails with `CorruptFreeList` if the list is longer than the number of
    /// pages in the file (a cycle) or links to a page that is not free.
    pub fn free_page_count(&self) -> Result<u64, AllocatorError> {
        let limit = self.header.next_page_id;
        let mut count = 0u64;
        let mut current = self.header.free_list_head;
        while current != NULL_PAGE {
            let page = self
                .page(current)
                .map_err(|_| AllocatorError::CorruptFreeList { page_id: current })?;
            if PageHeader::page_type(page) != Ok(PageType::Free) || count >= limit {
                return Err(AllocatorError::CorruptFreeList { page_id: current });
            }
            count += 1;
            current = page.read_u64(PageHeader::NEXT_FREE_OFFSET);
        }
        Ok(count)
    }

    /// Flush the backing store.
    pub fn flush(&mut self) -> Result<(), AllocatorError> {
        self.store.flush()?;
        Ok(())
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consume the allocator and return its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Errors from the page allocator.
#[derive(Debug)]
pub enum AllocatorError {
    /// Backing store failure.
    Store(StoreError),
    /// Page 0 is not a valid tree header.
    Header(HeaderError),
    /// Page id is 0 or was never allocated.
    PageOutOfRange {
        page_id: PageId,
        next_page_id: PageId,
    },
    /// Attempt to free a page that is already on the free list.
    DoubleFree(PageId),
    /// Free list links to a page that is not free, or loops.
    CorruptFreeList { page_id: PageId },
    /// Page ids would overflow the file offset space.
    AddressSpaceExhausted,
}

impl std::fmt::Display for AllocatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "storage error: {e}"),
            Self::Header(e) => write!(f, "invalid tree header: {e}"),
            Self::PageOutOfRange {
                page_id,
                next_page_id,
            } => write!(
                f,
                "page {page_id} out of range (valid pages: 1..{next_page_id})"
            ),
            Self::DoubleFree(page_id) => write!(f, "page {page_id} is already free"),
            Self::CorruptFreeList { page_id } => {
                write!(f, "free list is corrupt at page {page_id}")
            }
            Self::AddressSpaceExhausted => write!(f, "page id space exhausted"),
        }
    }
}

impl std::error::Error for AllocatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Header(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for AllocatorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<HeaderError> for AllocatorError {
    fn from(e: HeaderError) -> Self {
        Self::Header(e)
    }
}
