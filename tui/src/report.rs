//! Research report rendering.
//!
//! Reports arrive as markdown-flavored text with a deliberately tiny
//! grammar: a line starting `##` is a sub-heading, `#` (not `##`) a
//! heading, `* ` a list item, and any other non-empty line a paragraph.
//! The transform is line-oriented and stateless - no nesting, no
//! escaping - so it is implemented directly instead of pulling in a
//! full markdown parser.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use atelier_types::Citation;

use crate::theme::colors;

/// One rendered block of a research report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBlock {
    Heading(String),
    SubHeading(String),
    ListItem(String),
    Paragraph(String),
}

/// Split report text into blocks, one per non-empty line.
#[must_use]
pub fn parse_report(text: &str) -> Vec<ReportBlock> {
    text.lines()
        .filter_map(|line| {
            if line.trim().is_empty() {
                return None;
            }
            let block = if let Some(rest) = line.strip_prefix("## ") {
                ReportBlock::SubHeading(rest.to_string())
            } else if let Some(rest) = line.strip_prefix("##") {
                ReportBlock::SubHeading(rest.trim_start().to_string())
            } else if let Some(rest) = line.strip_prefix('#') {
                ReportBlock::Heading(rest.trim_start().to_string())
            } else if let Some(rest) = line.strip_prefix("* ") {
                ReportBlock::ListItem(rest.to_string())
            } else {
                ReportBlock::Paragraph(line.to_string())
            };
            Some(block)
        })
        .collect()
}

/// Render a report body plus its citations to ratatui lines.
#[must_use]
pub fn render_report(text: &str, citations: &[Citation]) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for block in parse_report(text) {
        match block {
            ReportBlock::Heading(heading) => {
                if !lines.is_empty() {
                    lines.push(Line::from(""));
                }
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(
                        heading,
                        Style::default()
                            .fg(colors::TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    ),
                ]));
            }
            ReportBlock::SubHeading(heading) => {
                if !lines.is_empty() {
                    lines.push(Line::from(""));
                }
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(
                        heading,
                        Style::default()
                            .fg(colors::TEXT_SECONDARY)
                            .add_modifier(Modifier::BOLD),
                    ),
                ]));
            }
            ReportBlock::ListItem(item) => {
                lines.push(Line::from(vec![
                    Span::raw("      • "),
                    Span::styled(item, Style::default().fg(colors::TEXT_SECONDARY)),
                ]));
            }
            ReportBlock::Paragraph(text) => {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(text, Style::default().fg(colors::TEXT_SECONDARY)),
                ]));
            }
        }
    }

    if !citations.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(
                "Sources",
                Style::default()
                    .fg(colors::TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
        for (index, citation) in citations.iter().enumerate() {
            let mut spans = vec![
                Span::styled(
                    format!("      [{}] ", index + 1),
                    Style::default().fg(colors::TEXT_MUTED),
                ),
                Span::styled(
                    citation.label().to_string(),
                    Style::default().fg(colors::CYAN),
                ),
            ];
            // When the label is a title, keep the URI visible next to it.
            if citation.label() != citation.uri {
                spans.push(Span::styled(
                    format!("  {}", citation.uri),
                    Style::default().fg(colors::TEXT_MUTED),
                ));
            }
            lines.push(Line::from(spans));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::{ReportBlock, parse_report, render_report};
    use atelier_types::Citation;

    #[test]
    fn parses_the_four_block_kinds() {
        let blocks = parse_report("# Title\n## Overview\nSolar grows.\n* wind\n* solar");
        assert_eq!(
            blocks,
            vec![
                ReportBlock::Heading("Title".to_string()),
                ReportBlock::SubHeading("Overview".to_string()),
                ReportBlock::Paragraph("Solar grows.".to_string()),
                ReportBlock::ListItem("wind".to_string()),
                ReportBlock::ListItem("solar".to_string()),
            ]
        );
    }

    #[test]
    fn double_hash_is_a_sub_heading_not_a_heading() {
        let blocks = parse_report("##Tight\n## Spaced");
        assert_eq!(
            blocks,
            vec![
                ReportBlock::SubHeading("Tight".to_string()),
                ReportBlock::SubHeading("Spaced".to_string()),
            ]
        );
    }

    #[test]
    fn blank_lines_are_skipped_and_stars_need_a_space() {
        let blocks = parse_report("first\n\n   \n*starred but not a list\n* item");
        assert_eq!(
            blocks,
            vec![
                ReportBlock::Paragraph("first".to_string()),
                ReportBlock::Paragraph("*starred but not a list".to_string()),
                ReportBlock::ListItem("item".to_string()),
            ]
        );
    }

    #[test]
    fn renders_full_report_with_citation() {
        let citations = vec![Citation {
            uri: "https://x.org".to_string(),
            title: Some("X".to_string()),
        }];
        let lines = render_report("## Overview\nSolar grows.\n* wind\n* solar", &citations);

        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();

        assert!(rendered.iter().any(|l| l.trim() == "Overview"));
        assert!(rendered.iter().any(|l| l.trim() == "Solar grows."));
        assert!(rendered.iter().any(|l| l.trim() == "• wind"));
        assert!(rendered.iter().any(|l| l.trim() == "• solar"));
        assert!(
            rendered
                .iter()
                .any(|l| l.contains("[1] X") && l.contains("https://x.org"))
        );
    }

    #[test]
    fn report_without_citations_has_no_sources_section() {
        let lines = render_report("just text", &[]);
        let all: String = lines
            .iter()
            .flat_map(|line| line.spans.iter())
            .map(|span| span.content.as_ref())
            .collect();
        assert!(!all.contains("Sources"));
    }
}
