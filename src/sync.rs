// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Synchronizes a repository's persisted schemes with a fresh scan.
///
/// Rendering a scheme means driving an editor process, so rendered data is
/// carried over whenever a scheme keeps its identity key across scans.
/// Schemes that are no longer declared upstream are dropped.
use std::collections::HashMap;

use indexmap::{IndexMap, map::Entry};
use tracing::debug;

use crate::model::{ColorData, ColorScheme};

/// Result of merging a scan into the persisted catalog.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct Reconciled
{
    /// Merged schemes in first-seen scan order.
    pub schemes: Vec<ColorScheme,>,
    /// Schemes seen for the first time.
    pub added:   usize,
    /// Schemes whose rendered data was carried forward.
    pub carried: usize,
    /// Persisted schemes dropped because the scan no longer declares them.
    pub removed: usize,
}

/// Merges freshly scanned declarations into the persisted scheme list.
///
/// 1. Scanned entries sharing a key collapse into the one with the newest
///    source timestamp (the first one wins ties).
/// 2. A scanned entry whose key exists in `persisted` keeps the persisted
///    data and `valid` flag; source, dialect and timestamp come from the
///    scan. Unknown keys start without data and `valid = false`.
/// 3. Persisted entries absent from the scan are dropped.
///
/// # Example
///
/// ```
/// use vcsw::{ColorScheme, Dialect, SchemeSource, reconcile};
///
/// let scanned = vec![ColorScheme::scanned("nord", SchemeSource::default(), Dialect::Script, None,)];
/// let merged = reconcile(scanned, Vec::new(),);
/// assert_eq!(merged.added, 1);
/// assert!(!merged.schemes[0].valid);
/// ```
pub fn reconcile(scanned: Vec<ColorScheme,>, persisted: Vec<ColorScheme,>,) -> Reconciled
{
    let mut latest: IndexMap<String, ColorScheme,> = IndexMap::with_capacity(scanned.len(),);
    for scheme in scanned {
        match latest.entry(scheme.name.clone(),) {
            Entry::Vacant(slot,) => {
                slot.insert(scheme,);
            }
            Entry::Occupied(mut slot,) => {
                if scheme.source_updated_at > slot.get().source_updated_at {
                    debug!("Replacing duplicate declaration of {} with {}", scheme.name, scheme.source.path);
                    slot.insert(scheme,);
                }
            }
        }
    }

    let persisted_count = persisted.len();
    let mut previous: HashMap<String, ColorScheme,> = HashMap::with_capacity(persisted_count,);
    for scheme in persisted {
        previous.entry(scheme.name.clone(),).or_insert(scheme,);
    }

    let mut added = 0;
    let mut carried = 0;
    let mut schemes = Vec::with_capacity(latest.len(),);

    for (key, scanned,) in latest {
        let merged = match previous.remove(&key,) {
            Some(old,) => {
                carried += 1;
                ColorScheme {
                    data: old.data,
                    valid: old.valid,
                    ..scanned
                }
            }
            None => {
                added += 1;
                ColorScheme {
                    data: ColorData::default(),
                    valid: false,
                    ..scanned
                }
            }
        };
        schemes.push(merged,);
    }

    Reconciled {
        removed: previous.len(),
        schemes,
        added,
        carried,
    }
}
