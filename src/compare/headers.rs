//! Header multimap equality.

use crate::forward::normalize::HeaderMultimap;

/// Same header names, and the same values in the same order for each name.
pub fn headers_equal(control: &HeaderMultimap, experiment: &HeaderMultimap) -> bool {
    control.len() == experiment.len()
        && control
            .iter()
            .all(|(name, values)| experiment.get(name) == Some(values))
}
