//! Markdown rendering and narrative text.

use std::fmt::Write;

use tw_core::WeeklyReport;

/// Render a report as a Markdown document.
///
/// Total over every report shape, including the empty window.
pub fn render_markdown(report: &WeeklyReport) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "# Weekly Tech Trends: {} to {}",
        report.window_start, report.window_end
    )
    .unwrap();
    writeln!(out).unwrap();

    if report.total_articles == 0 {
        writeln!(out, "No articles were collected in this period.").unwrap();
        return out;
    }

    if !report.summary.is_empty() {
        writeln!(out, "{}", report.summary).unwrap();
        writeln!(out).unwrap();
    }

    writeln!(out, "## Overview").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "- Articles collected: {}", report.total_articles).unwrap();
    for (source, count) in &report.source_distribution {
        writeln!(out, "- From {source}: {count}").unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "## Topic Distribution").unwrap();
    writeln!(out).unwrap();
    for (topic, count) in &report.topic_distribution {
        writeln!(out, "- {topic}: {count}").unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "## Trending Topics").unwrap();
    writeln!(out).unwrap();
    for (rank, trend) in report.trending_topics.iter().enumerate() {
        writeln!(
            out,
            "{}. **{}**: {} articles, average relevance {:.2}, trend score {:.2}",
            rank + 1,
            trend.topic,
            trend.count,
            trend.average_relevance,
            trend.trend_score
        )
        .unwrap();
    }
    writeln!(out).unwrap();

    writeln!(out, "## Top Articles").unwrap();
    writeln!(out).unwrap();
    for (rank, article) in report.top_articles.iter().enumerate() {
        writeln!(out, "{}. [{}]({})", rank + 1, article.title, article.url).unwrap();
        writeln!(
            out,
            "   {} | {} | score {:.2} | {}",
            article.source,
            article.discovered_date,
            article.relevance_score,
            article.related_topics.join(", ")
        )
        .unwrap();
        if !article.summary.is_empty() {
            writeln!(out, "   {}", article.summary).unwrap();
        }
    }

    out
}

/// Compact plain-text digest of a report, fed to a chat summarizer when a
/// model-written narrative is wanted.
pub fn narrative_digest(report: &WeeklyReport) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Window: {} to {}",
        report.window_start, report.window_end
    )
    .unwrap();
    writeln!(out, "Articles: {}", report.total_articles).unwrap();
    for trend in &report.trending_topics {
        writeln!(
            out,
            "Topic {}: {} articles, average relevance {:.2}",
            trend.topic, trend.count, trend.average_relevance
        )
        .unwrap();
    }
    for article in &report.top_articles {
        writeln!(
            out,
            "- {} [{}] {}",
            article.title,
            article.related_topics.join(", "),
            article.summary
        )
        .unwrap();
    }
    out
}

/// Deterministic narrative built from the report's own numbers. Used when no
/// chat summarizer is configured or the model call fails.
pub fn fallback_narrative(report: &WeeklyReport) -> String {
    if report.total_articles == 0 {
        return format!(
            "No articles were collected between {} and {}.",
            report.window_start, report.window_end
        );
    }

    let sources = report.source_distribution.len();
    let mut narrative = format!(
        "Collected {} article{} from {} source{} between {} and {}.",
        report.total_articles,
        plural(report.total_articles),
        sources,
        plural(sources),
        report.window_start,
        report.window_end,
    );
    if let Some(leader) = report.trending_topics.first() {
        write!(
            narrative,
            " The strongest topic was {} with {} article{} and an average relevance of {:.2}.",
            leader.topic,
            leader.count,
            plural(leader.count),
            leader.average_relevance
        )
        .unwrap();
    }
    narrative
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
