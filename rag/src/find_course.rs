use crate::catalog::{Catalog, CourseRecord};
use crate::extract_code::extract_code;

/// Exact course-code lookup. No fuzzy or partial matching: either the first
/// code-shaped token in the question names a catalog row, or nothing is found.
pub fn find_course<'a>(catalog: &'a Catalog, question: &str) -> Option<&'a CourseRecord> {
    let code = extract_code(question)?;
    let record = catalog.get(&code);
    tracing::debug!(%code, found = record.is_some(), "exact course lookup");
    record
}
