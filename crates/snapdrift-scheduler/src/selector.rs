//! Image selection: uniform random over the eligible pool.

use rand::{rngs::OsRng, Rng};
use tracing::info;

use snapdrift_images::{Image, ImageStore};

use crate::error::{Result, SchedulerError};

/// Pick the next image to send: active, unsent, chosen uniformly at random.
///
/// Read-only — marking the image sent happens only after confirmed delivery.
///
/// When the pool is exhausted (every active image already sent) and
/// `auto_cycle` is on, all active sent flags are cleared and selection is
/// retried once. With `auto_cycle` off, or with no active images at all,
/// returns [`SchedulerError::NoEligibleImage`].
pub fn select_next(store: &dyn ImageStore, auto_cycle: bool) -> Result<Image> {
    let mut eligible = store.list_eligible()?;

    if eligible.is_empty() && auto_cycle {
        let reset = store.reset_all_sent_flags()?;
        if reset > 0 {
            info!(reset, "image pool exhausted; sent flags cleared for a new cycle");
            eligible = store.list_eligible()?;
        }
    }

    if eligible.is_empty() {
        return Err(SchedulerError::NoEligibleImage);
    }

    let idx = OsRng.gen_range(0..eligible.len());
    Ok(eligible.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::InMemoryImageStore;
    use std::collections::HashSet;

    #[test]
    fn never_returns_inactive_or_sent() {
        let store = InMemoryImageStore::with_images(&[
            ("a.jpg", true, false),
            ("b.jpg", true, true),
            ("c.jpg", false, false),
        ]);
        for _ in 0..50 {
            let img = select_next(&store, false).unwrap();
            assert_eq!(img.filename, "a.jpg");
        }
    }

    #[test]
    fn selection_is_read_only() {
        let store = InMemoryImageStore::with_images(&[
            ("a.jpg", true, false),
            ("b.jpg", true, false),
            ("c.jpg", true, false),
        ]);
        for _ in 0..50 {
            select_next(&store, true).unwrap();
        }
        assert_eq!(store.list_eligible().unwrap().len(), 3);
    }

    #[test]
    fn all_eligible_candidates_are_reachable() {
        // Uniform selection over 3 candidates: 200 draws miss one with
        // probability (2/3)^200 — effectively never.
        let store = InMemoryImageStore::with_images(&[
            ("a.jpg", true, false),
            ("b.jpg", true, false),
            ("c.jpg", true, false),
        ]);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(select_next(&store, false).unwrap().filename);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn exhausted_pool_with_auto_cycle_resets_and_selects() {
        let store =
            InMemoryImageStore::with_images(&[("a.jpg", true, true), ("b.jpg", true, true)]);
        let img = select_next(&store, true).unwrap();
        assert!(!img.is_sent);
        // Both flags were cleared by the reset.
        assert_eq!(store.list_eligible().unwrap().len(), 2);
    }

    #[test]
    fn exhausted_pool_without_auto_cycle_fails() {
        let store = InMemoryImageStore::with_images(&[("a.jpg", true, true)]);
        assert!(matches!(
            select_next(&store, false),
            Err(SchedulerError::NoEligibleImage)
        ));
    }

    #[test]
    fn empty_pool_fails_even_with_auto_cycle() {
        let store = InMemoryImageStore::with_images(&[]);
        assert!(matches!(
            select_next(&store, true),
            Err(SchedulerError::NoEligibleImage)
        ));
    }

    #[test]
    fn inactive_only_pool_fails_with_auto_cycle() {
        let store = InMemoryImageStore::with_images(&[("a.jpg", false, false)]);
        assert!(matches!(
            select_next(&store, true),
            Err(SchedulerError::NoEligibleImage)
        ));
    }
}
