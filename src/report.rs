use serde::{Deserialize, Serialize};

use crate::settings::ReportFormat;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityMatch {
    pub is_same_entity: bool,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Finding {
    fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            note: None,
        }
    }

    fn with_note(summary: &str, note: &str) -> Self {
        Self {
            summary: summary.to_string(),
            note: Some(note.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub verdict: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Structured output of one completed comparison run. Immutable once
/// produced; dropped when the run restarts. Optional fields may be absent
/// in partially populated reports and must render gracefully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub entity_match: EntityMatch,
    #[serde(default)]
    pub similarities: Vec<Finding>,
    #[serde(default)]
    pub differences: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_assessment: Option<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standards_compliance: Option<Assessment>,
    #[serde(default)]
    pub safety_findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl AnalysisReport {
    /// Fixed comparison payload standing in for the output of the real
    /// analysis backend; a live backend would populate this from its
    /// response at the start of a run.
    pub fn pipeline_comparison() -> Self {
        Self {
            entity_match: EntityMatch {
                is_same_entity: true,
                rationale: "The overall routing and principal features indicate both drawings \
                            describe the same pipeline system."
                    .into(),
            },
            similarities: vec![
                Finding::with_note(
                    "Pipe diameters match",
                    "The base parameters agree; the drawings are likely revisions of the same \
                     project.",
                ),
                Finding::new("Material grades are identical"),
            ],
            differences: vec![
                Finding::new("Pipe run lengths differ"),
                Finding::with_note(
                    "Joint types have changed",
                    "Likely a design iteration or an adjustment for site requirements.",
                ),
            ],
            quality_assessment: Some(Assessment {
                verdict: "Drawings are clean with legible detail".into(),
                note: Some(
                    "High drawing quality supports accurate interpretation of design intent."
                        .into(),
                ),
            }),
            standards_compliance: Some(Assessment {
                verdict: "Conforms to industry standard XYZ-2023".into(),
                note: Some(
                    "Compliance with the current standard covers today's safety and efficiency \
                     requirements."
                        .into(),
                ),
            }),
            safety_findings: vec![
                Finding::new("Add corrosion protection along the buried section"),
                Finding::new("Fit an emergency shutoff valve"),
            ],
            cost_impact: Some(
                "The revised design should cut material cost by roughly 10%.".into(),
            ),
            environmental_impact: Some(
                "The revised design should cut energy consumption by roughly 5%.".into(),
            ),
            disclaimer: Some(
                "Automated comparison output. Have a qualified engineer confirm every finding \
                 before acting on this report."
                    .into(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub heading: String,
    pub lines: Vec<String>,
}

/// Read-only rendering of a report into ordered sections. Absent optional
/// fields and empty finding lists are omitted rather than rendered empty, so
/// a partially populated report always renders. The simplified format keeps
/// only the verdict, the differences, and the safety findings.
pub fn render_report(report: &AnalysisReport, format: ReportFormat) -> Vec<ReportSection> {
    let full = format == ReportFormat::Full;
    let mut sections = Vec::new();

    let mut verdict = vec![if report.entity_match.is_same_entity {
        "The drawings describe the same entity.".to_string()
    } else {
        "The drawings describe different entities.".to_string()
    }];
    if !report.entity_match.rationale.is_empty() {
        verdict.push(report.entity_match.rationale.clone());
    }
    sections.push(ReportSection {
        heading: "Entity match".into(),
        lines: verdict,
    });

    if full {
        push_findings(&mut sections, "Similarities", &report.similarities);
    }
    push_findings(&mut sections, "Differences", &report.differences);

    if full {
        push_assessment(&mut sections, "Quality assessment", &report.quality_assessment);
        push_assessment(
            &mut sections,
            "Standards compliance",
            &report.standards_compliance,
        );
    }

    push_findings(&mut sections, "Safety findings", &report.safety_findings);

    if full {
        push_statement(&mut sections, "Cost impact", &report.cost_impact);
        push_statement(
            &mut sections,
            "Environmental impact",
            &report.environmental_impact,
        );
    }

    push_statement(&mut sections, "Disclaimer", &report.disclaimer);
    sections
}

fn push_findings(sections: &mut Vec<ReportSection>, heading: &str, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    let mut lines = Vec::new();
    for finding in findings {
        lines.push(finding.summary.clone());
        if let Some(note) = &finding.note {
            lines.push(note.clone());
        }
    }
    sections.push(ReportSection {
        heading: heading.to_string(),
        lines,
    });
}

fn push_assessment(
    sections: &mut Vec<ReportSection>,
    heading: &str,
    assessment: &Option<Assessment>,
) {
    let Some(assessment) = assessment else {
        return;
    };
    let mut lines = vec![assessment.verdict.clone()];
    if let Some(note) = &assessment.note {
        lines.push(note.clone());
    }
    sections.push(ReportSection {
        heading: heading.to_string(),
        lines,
    });
}

fn push_statement(sections: &mut Vec<ReportSection>, heading: &str, statement: &Option<String>) {
    let Some(statement) = statement else {
        return;
    };
    sections.push(ReportSection {
        heading: heading.to_string(),
        lines: vec![statement.clone()],
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(sections: &[ReportSection]) -> Vec<&str> {
        sections.iter().map(|s| s.heading.as_str()).collect()
    }

    #[test]
    fn full_format_renders_every_populated_section() {
        let report = AnalysisReport::pipeline_comparison();
        let sections = render_report(&report, ReportFormat::Full);
        assert_eq!(
            headings(&sections),
            vec![
                "Entity match",
                "Similarities",
                "Differences",
                "Quality assessment",
                "Standards compliance",
                "Safety findings",
                "Cost impact",
                "Environmental impact",
                "Disclaimer",
            ]
        );
    }

    #[test]
    fn simplified_format_keeps_verdict_differences_and_safety() {
        let report = AnalysisReport::pipeline_comparison();
        let sections = render_report(&report, ReportFormat::Simplified);
        assert_eq!(
            headings(&sections),
            vec![
                "Entity match",
                "Differences",
                "Safety findings",
                "Disclaimer",
            ]
        );
    }

    #[test]
    fn partial_report_renders_without_missing_sections() {
        let report = AnalysisReport {
            entity_match: EntityMatch {
                is_same_entity: false,
                rationale: String::new(),
            },
            similarities: Vec::new(),
            differences: Vec::new(),
            quality_assessment: None,
            standards_compliance: None,
            safety_findings: Vec::new(),
            cost_impact: None,
            environmental_impact: None,
            disclaimer: None,
        };

        let sections = render_report(&report, ReportFormat::Full);
        assert_eq!(headings(&sections), vec!["Entity match"]);
        assert_eq!(
            sections[0].lines,
            vec!["The drawings describe different entities."]
        );
    }

    #[test]
    fn findings_include_their_notes() {
        let report = AnalysisReport::pipeline_comparison();
        let sections = render_report(&report, ReportFormat::Full);
        let differences = sections
            .iter()
            .find(|s| s.heading == "Differences")
            .unwrap();
        assert_eq!(differences.lines.len(), 3);
    }
}
