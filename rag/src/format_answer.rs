use crate::catalog::CourseRecord;

/// Renders a catalog row as a Markdown answer. Blank fields are left out entirely.
pub fn format_course_answer(record: &CourseRecord) -> String {
    let code = record.course_code.trim();
    let title = record.course_title.trim();
    let credits = record.credits.trim();
    let description = record.description.trim();
    let prerequisites = record.prerequisites.trim();
    let url = record.source_url.trim();

    let mut lines = Vec::new();
    if !code.is_empty() || !title.is_empty() {
        lines.push(format!("**{code}: {title}**"));
    }
    if !credits.is_empty() {
        lines.push(format!("**Credits:** {credits}"));
    }
    if !description.is_empty() {
        lines.push(description.to_string());
    }
    if !prerequisites.is_empty() {
        lines.push(format!("**Prerequisites:** {prerequisites}"));
    }
    for req in &record.required_for_program {
        let requirement = req.requirement.trim();
        if !requirement.is_empty() {
            lines.push(format!("**Required for {}:** {requirement}", req.program.trim()));
        }
    }
    if !url.is_empty() {
        lines.push(format!("(Source: {url})"));
    }

    lines.join("\n\n")
}
