use crate::models::ResearchResult;

/// Renders a result as a Markdown document.
pub fn render_markdown(result: &ResearchResult) -> String {
    let title = if result.topic.trim().is_empty() {
        "Research"
    } else {
        result.topic.as_str()
    };

    let mut sections = vec![
        format!("# {title}"),
        format!("**Style:** {}", result.style),
        format!("## Summary\n{}", result.summary),
    ];
    if !result.why_these_sources.is_empty() {
        sections.push(format!(
            "## Why these sources?\n{}",
            bullets(&result.why_these_sources)
        ));
    }
    sections.push(if result.sources.is_empty() {
        "## Sources\nNo sources returned.".to_string()
    } else {
        format!("## Sources\n{}", numbered_links(&result.sources))
    });
    if !result.freshness_notes.is_empty() {
        sections.push(format!("## Freshness notes\n{}", result.freshness_notes));
    }
    let tools = if result.tools_used.is_empty() {
        "—".to_string()
    } else {
        result.tools_used.join(", ")
    };
    sections.push(format!("_Tools used: {tools}_"));

    sections.join("\n\n") + "\n"
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered_links(sources: &[String]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| format!("{}. [{source}]({source})", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
