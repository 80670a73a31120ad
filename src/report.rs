//! Console trace and JSON rendering of analysis results
//!
//! The text trace lists each behavior, then for each recorded parameter the
//! test that ran, its p-value and statistic, and any post-hoc table indented
//! underneath.

use crate::analysis::{AnalysisReport, BehaviorReport, ResultRow, RowOutcome};
use std::fmt::Write as _;

/// Render the trace for one behavior
pub fn render_behavior(report: &BehaviorReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.behavior);

    for row in &report.rows {
        render_row(&mut out, row);
        if let Some(post_hoc) = report.post_hoc_for(&row.parameter) {
            let _ = writeln!(out, "\t\t{} post-hoc results:", post_hoc.procedure.name());
            for line in post_hoc.to_string().lines() {
                let _ = writeln!(out, "\t\t{}", line);
            }
        }
    }
    out
}

fn render_row(out: &mut String, row: &ResultRow) {
    let _ = writeln!(out, "\t {}", row.parameter);
    match &row.outcome {
        RowOutcome::Tested {
            test,
            pvalue,
            statistic,
        } => {
            let _ = writeln!(out, "\t performing {}", test.name());
            let _ = writeln!(out, "\t\t p-value:  {}", pvalue);
            let _ = writeln!(out, "\t\t statistic:  {}", statistic);
        }
        RowOutcome::Skipped { reason } => {
            let _ = writeln!(out, "\t skipped: {}", reason);
        }
    }
    for labeled in &row.summaries {
        let _ = writeln!(out, "\t\t {}: {}", labeled.group, labeled.summary);
    }
}

/// Render the trace for a full report
pub fn render(report: &AnalysisReport) -> String {
    report.behaviors.iter().map(render_behavior).collect()
}

/// Serialize a report as pretty-printed JSON
pub fn to_json(report: &AnalysisReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LabeledSummary, PostHocReport};
    use crate::selection::{
        AnalysisPath, MultiGroupTest, PostHocProcedure, SelectedTest, TwoGroupTest,
    };
    use crate::stats::{PairwiseComparison, PostHocResult, SampleSummary};

    fn tested(parameter: &str, test: SelectedTest, pvalue: f64, statistic: f64) -> ResultRow {
        ResultRow {
            parameter: parameter.to_string(),
            outcome: RowOutcome::Tested {
                test,
                pvalue,
                statistic,
            },
            summaries: Vec::new(),
        }
    }

    #[test]
    fn test_render_two_group_behavior() {
        let report = BehaviorReport {
            behavior: "grooming".to_string(),
            rows: vec![tested(
                "duration",
                SelectedTest::TwoGroup(TwoGroupTest::UnpairedT),
                0.01,
                -3.5,
            )],
            post_hoc: Vec::new(),
        };
        let text = render_behavior(&report);
        assert_eq!(
            text,
            "grooming\n\t duration\n\t performing unpaired t-test\n\t\t p-value:  0.01\n\t\t statistic:  -3.5\n"
        );
    }

    #[test]
    fn test_render_post_hoc_is_indented() {
        let report = BehaviorReport {
            behavior: "rearing".to_string(),
            rows: vec![tested(
                "count",
                SelectedTest::MultiGroup(MultiGroupTest::KruskalWallis),
                0.002,
                12.0,
            )],
            post_hoc: vec![PostHocReport {
                parameter: "count".to_string(),
                result: PostHocResult {
                    procedure: PostHocProcedure::Dunn,
                    labels: vec!["a".to_string(), "b".to_string()],
                    comparisons: vec![PairwiseComparison {
                        first: "a".to_string(),
                        second: "b".to_string(),
                        statistic: 2.1,
                        pvalue: 0.03,
                        interval: None,
                    }],
                },
            }],
        };
        let text = render_behavior(&report);
        assert!(text.contains("\t performing Kruskal Wallis\n"));
        assert!(text.contains("\t\tDunn's post-hoc results:\n"));
        let table: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.contains("post-hoc"))
            .skip(1)
            .collect();
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|l| l.starts_with("\t\t")));
        assert!(table[1].contains("0.030000"));
    }

    #[test]
    fn test_render_skipped_and_summaries() {
        let mut row = tested(
            "speed",
            SelectedTest::TwoGroup(TwoGroupTest::MannWhitneyU),
            0.2,
            14.0,
        );
        row.summaries.push(LabeledSummary {
            group: "wt".to_string(),
            summary: SampleSummary {
                n: 3,
                mean: 2.0,
                stddev: 1.0,
                median: 2.0,
            },
        });
        let report = BehaviorReport {
            behavior: "walk".to_string(),
            rows: vec![
                row,
                ResultRow {
                    parameter: "pace".to_string(),
                    outcome: RowOutcome::Skipped {
                        reason: "too few values".to_string(),
                    },
                    summaries: Vec::new(),
                },
            ],
            post_hoc: Vec::new(),
        };
        let text = render_behavior(&report);
        assert!(text.contains("\t\t wt: n=3 mean=2.0000 sd=1.0000 median=2.0000\n"));
        assert!(text.contains("\t pace\n\t skipped: too few values\n"));
    }

    #[test]
    fn test_json_report_shape() {
        let report = AnalysisReport {
            path: AnalysisPath::TwoGroup,
            behaviors: vec![BehaviorReport {
                behavior: "walk".to_string(),
                rows: vec![tested(
                    "speed",
                    SelectedTest::TwoGroup(TwoGroupTest::PairedT),
                    0.04,
                    2.5,
                )],
                post_hoc: Vec::new(),
            }],
        };
        let json = to_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["path"], "TwoGroup");
        let row = &value["behaviors"][0]["rows"][0];
        assert_eq!(row["parameter"], "speed");
        assert_eq!(row["status"], "tested");
        assert_eq!(row["test"], "PairedT");
        assert_eq!(row["pvalue"], 0.04);
        assert!(row.get("summaries").is_none());
        assert!(value["behaviors"][0].get("post_hoc").is_none());
    }

    #[test]
    fn test_render_full_report_concatenates_behaviors() {
        let behavior = |name: &str| BehaviorReport {
            behavior: name.to_string(),
            rows: Vec::new(),
            post_hoc: Vec::new(),
        };
        let report = AnalysisReport {
            path: AnalysisPath::MultiGroup,
            behaviors: vec![behavior("a"), behavior("b")],
        };
        assert_eq!(render(&report), "a\nb\n");
    }
}
