//! Nearest-thread matching under CIE76 Delta E.

use crate::catalog::{Brand, ThreadCatalog, ThreadEntry};
use crate::color_space::LabColor;
use crate::error::MatchError;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Inventory preference for [`find_closest`].
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Search the inventory subset first, falling back to all candidates
    /// when none of them are owned.
    pub prefer_inventory: bool,
    /// Thread ids the user owns.
    pub inventory_ids: HashSet<String>,
}

impl MatchOptions {
    pub fn with_inventory<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefer_inventory: true,
            inventory_ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// How visible the difference between target and match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// ΔE < 2, only noticeable side by side
    Excellent,
    /// ΔE < 5
    Good,
    Acceptable,
}

impl MatchQuality {
    pub fn from_delta_e(delta_e: f64) -> Self {
        if delta_e < 2.0 {
            MatchQuality::Excellent
        } else if delta_e < 5.0 {
            MatchQuality::Good
        } else {
            MatchQuality::Acceptable
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThreadMatch<'a> {
    pub thread: &'a ThreadEntry,
    pub delta_e: f64,
    pub quality: MatchQuality,
    pub from_inventory: bool,
}

/// Closest candidate by squared distance; ties go to the lowest thread id.
fn nearest<'a>(target: &LabColor, pool: &[&'a ThreadEntry]) -> Option<(&'a ThreadEntry, f64)> {
    pool.par_iter()
        .map(|&t| (t, target.distance_sq(&t.lab)))
        .min_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| a.0.thread_id.cmp(&b.0.thread_id))
        })
}

/// Find the candidate thread nearest to `target`.
///
/// With `prefer_inventory` the search is restricted to owned threads; if
/// none of the candidates are owned, the full candidate set is used instead.
pub fn find_closest<'a>(
    target: &LabColor,
    candidates: &[&'a ThreadEntry],
    options: &MatchOptions,
) -> Result<ThreadMatch<'a>, MatchError> {
    let owned: Vec<&'a ThreadEntry> = if options.prefer_inventory {
        candidates
            .iter()
            .copied()
            .filter(|t| options.inventory_ids.contains(&t.thread_id))
            .collect()
    } else {
        Vec::new()
    };

    if options.prefer_inventory && owned.is_empty() && !candidates.is_empty() {
        log::warn!(
            "No inventory threads among {} candidates, matching against all",
            candidates.len()
        );
    }

    let pool: &[&'a ThreadEntry] = if owned.is_empty() { candidates } else { &owned };
    let (thread, dist_sq) = nearest(target, pool).ok_or(MatchError::EmptyCandidateSet)?;
    let delta_e = dist_sq.sqrt();

    Ok(ThreadMatch {
        thread,
        delta_e,
        quality: MatchQuality::from_delta_e(delta_e),
        from_inventory: options.inventory_ids.contains(&thread.thread_id),
    })
}

/// Find the `to` brand thread nearest in colour to `from`'s thread `code`.
pub fn convert_thread_brand<'a>(
    catalog: &'a ThreadCatalog,
    code: &str,
    from: Brand,
    to: Brand,
) -> Result<ThreadMatch<'a>, MatchError> {
    let source = catalog
        .find_code(from, code)
        .ok_or_else(|| MatchError::UnknownThread {
            brand: from.to_string(),
            code: code.to_string(),
        })?;

    let candidates = catalog.by_brand(to);
    if candidates.is_empty() {
        return Err(MatchError::UnsupportedBrand(to.to_string()));
    }
    find_closest(&source.lab, &candidates, &MatchOptions::default())
}
