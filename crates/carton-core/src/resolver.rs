//! Identifier normalization and file resolution.
//!
//! Both passes drop bad entries silently; an aggregate failure surfaces
//! from the dispatcher only when nothing survives. Selection order is
//! preserved through both passes because the archive budget cutoff is
//! order-sensitive.

use std::collections::HashSet;
use std::fs;

use carton_fsops::FileRef;
use tracing::debug;

use crate::model::{Caller, Library};

/// Parse raw identifiers into deduplicated positive ids, preserving
/// first-occurrence order. Non-numeric and zero entries are dropped.
#[must_use]
pub fn normalize(raw_ids: &[String]) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for raw in raw_ids {
        let Ok(id) = raw.trim().parse::<u64>() else {
            continue;
        };
        if id == 0 || !seen.insert(id) {
            continue;
        }
        ids.push(id);
    }
    ids
}

/// Resolve ids into [`FileRef`]s the caller may access and that exist on
/// disk right now. Ids failing authorization, lookup, or the existence
/// check are dropped.
#[must_use]
pub fn resolve_accessible(library: &dyn Library, caller: &Caller, ids: &[u64]) -> Vec<FileRef> {
    let mut resolved = Vec::with_capacity(ids.len());
    for &id in ids {
        if !library.can_access(caller, id) {
            debug!(id, caller_id = caller.id, "caller may not access file");
            continue;
        }
        let Some(file) = library.lookup(id) else {
            debug!(id, "identifier does not resolve to a library file");
            continue;
        };
        let Ok(metadata) = fs::metadata(&file.path) else {
            debug!(id, path = %file.path.display(), "backing file missing on disk");
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        resolved.push(FileRef {
            id,
            path: file.path,
            size: metadata.len(),
            display_name: file.display_name,
            url: file.url,
        });
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn normalize_drops_invalid_entries() {
        let ids = normalize(&raw(&["5", "abc", "-3", "0", "7", ""]));
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn normalize_deduplicates_preserving_first_occurrence_order() {
        let ids = normalize(&raw(&["9", "5", "9", "5", "2"]));
        assert_eq!(ids, vec![9, 5, 2]);
    }

    #[test]
    fn normalize_accepts_surrounding_whitespace() {
        let ids = normalize(&raw(&[" 12 ", "\t4\n"]));
        assert_eq!(ids, vec![12, 4]);
    }
}
