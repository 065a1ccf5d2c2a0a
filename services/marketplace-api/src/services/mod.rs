//! Business services behind the HTTP handlers
//!
//! Handlers stay thin; everything that touches the datastore, the
//! cache store or the resolution engine lives here.

pub mod activity;
pub mod collection;
pub mod orders;
pub mod portfolio;
pub mod ranking;
pub mod user;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Converts 1-indexed page parameters to an offset and a clamped
/// limit. Page 0 is treated as page 1.
pub fn page_bounds(page: usize, page_size: usize) -> (usize, usize) {
    let page = page.max(1);
    let size = match page_size {
        0 => DEFAULT_PAGE_SIZE,
        n => n.min(MAX_PAGE_SIZE),
    };
    ((page - 1) * size, size)
}
