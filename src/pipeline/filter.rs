use crate::record::{CrashRecord, FilterCriteria};

/// Returns the records matching `criteria`, in their original order.
///
/// A record is kept iff its collision type, year and severity all pass.
/// The three predicates are independent, so the order they are checked in
/// does not change the result.
pub fn filter<'a>(records: &'a [CrashRecord], criteria: &FilterCriteria) -> Vec<&'a CrashRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}
