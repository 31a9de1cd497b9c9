/// Page size for keyset scans: `WHERE id > last_id ORDER BY id ASC LIMIT
/// PAGE_SIZE`. A short (or empty) page is the termination signal; there is
/// no separate "has more" flag.
pub const PAGE_SIZE: i64 = 100;

/// True iff a page of `returned` rows (out of a requested `PAGE_SIZE`) means
/// the scan should stop: either nothing came back, or fewer rows came back
/// than were asked for.
pub fn is_last_page(returned: usize) -> bool {
    returned == 0 || (returned as i64) < PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_terminates() {
        assert!(is_last_page(0));
    }

    #[test]
    fn short_page_terminates() {
        assert!(is_last_page(42));
    }

    #[test]
    fn full_page_continues() {
        assert!(!is_last_page(PAGE_SIZE as usize));
    }
}
