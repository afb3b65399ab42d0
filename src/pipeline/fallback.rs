//! Deterministic substitutes for stage output.
//!
//! Used when a stage's output is malformed, or when its upstream call
//! fails under the `Fallback` policy. Every function here is a pure
//! function of its inputs and never returns empty content.

use std::fmt::Write;

use super::report::{RankedSource, ResearchPlan};

/// Template sub-questions derived from the raw query.
#[must_use]
pub fn fallback_plan(query: &str) -> ResearchPlan {
    let q = query.trim();
    ResearchPlan {
        sub_questions: vec![
            format!("What is {q}?"),
            format!("What are the key aspects of {q}?"),
            format!("What are the recent developments in {q}?"),
        ],
        focus_areas: Vec::new(),
    }
}

/// Summary recorded when the search stage falls back.
///
/// `retained` counts the ranked sources kept from sub-questions searched
/// before the failure.
#[must_use]
pub fn fallback_search_summary(query: &str, sub_questions: &[String], retained: usize) -> String {
    let planned = format!(
        "{} sub-question{}",
        sub_questions.len(),
        if sub_questions.len() == 1 { "" } else { "s" },
    );
    if retained == 0 {
        return format!(
            "No sources retrieved for \"{}\" ({planned}); the report relies on the research plan only.",
            query.trim(),
        );
    }
    format!(
        "Search for \"{}\" stopped early ({planned}); kept {retained} ranked source{} found before the failure.",
        query.trim(),
        if retained == 1 { "" } else { "s" },
    )
}

/// Markdown report assembled from the plan and ranked sources.
#[must_use]
pub fn fallback_report(
    query: &str,
    plan: Option<&ResearchPlan>,
    sources: &[RankedSource],
) -> String {
    let mut out = format!("# Research: {}\n\n", query.trim());
    out.push_str(
        "_Automated synthesis was unavailable; this report lists the collected material._\n\n",
    );

    if let Some(plan) = plan.filter(|p| !p.sub_questions.is_empty()) {
        out.push_str("## Research questions\n\n");
        for question in &plan.sub_questions {
            let _ = writeln!(out, "- {question}");
        }
        out.push('\n');
    }

    out.push_str("## Sources\n\n");
    if sources.is_empty() {
        out.push_str("No sources met the quality threshold.\n");
    } else {
        for (i, ranked) in sources.iter().enumerate() {
            let title = if ranked.source.title.trim().is_empty() {
                ranked.source.url.as_str()
            } else {
                ranked.source.title.as_str()
            };
            let _ = writeln!(
                out,
                "{}. [{}]({}) (quality {:.2})",
                i + 1,
                title,
                ranked.source.url,
                ranked.score.overall()
            );
            if !ranked.source.snippet.trim().is_empty() {
                let _ = writeln!(out, "   > {}", ranked.source.snippet.trim());
            }
        }
    }
    out
}
