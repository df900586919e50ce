//! Groups evaluation outcomes by indicator category
//!
//! Single linear pass: categories appear in the order their first indicator
//! was seen, findings in the order the service emitted them. No sorting, no
//! deduplication. An indicator without a category fails the whole pass.

use crate::category_map::IndicatorCategoryMap;
use crate::error::Result;
use crate::evaluation::EvaluationOutcome;
use crate::report::{CategoryGroups, IndicatorFinding};

/// Aggregate `outcomes` into category groups
///
/// # Returns
/// * `Ok(groups)` - possibly empty when `outcomes` is empty
/// * `Err(UnknownIndicator)` - an outcome's indicator is not in `categories`
pub fn aggregate<I>(outcomes: I, categories: &IndicatorCategoryMap) -> Result<CategoryGroups>
where
    I: IntoIterator<Item = EvaluationOutcome>,
{
    let mut groups = CategoryGroups::new();

    for outcome in outcomes {
        let category = categories.lookup(&outcome.indicator_id)?;
        groups.push(
            category,
            IndicatorFinding {
                indicator_id: outcome.indicator_id,
                comment: outcome.comment,
                is_valid: outcome.passed,
            },
        );
    }

    Ok(groups)
}
