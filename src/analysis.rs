//! Two-group and multi-group analysis paths and the orchestrator
//!
//! For every (behavior, parameter) the analyzer gathers one sample per group
//! (control first when designated), runs the normality gate, selects and runs
//! the primary test, applies the recording rule and, in the multi-group path,
//! runs the post-hoc procedure for recorded results. Behaviors and parameters
//! are visited in the first group's order.

use crate::config::AnalysisConfig;
use crate::dataset::{Behavior, Group, Sample};
use crate::error::{AnalysisError, Result};
use crate::report;
use crate::selection::{
    select_multi_group_test, select_path, select_post_hoc, select_two_group_test, should_record,
    AnalysisPath, MultiGroupTest, PostHocProcedure, SelectedTest, TwoGroupTest,
};
use crate::stats::{
    all_normal, nonparametric, parametric, posthoc, summarize, NormalityTest, PostHocResult,
    SampleSummary, ShapiroWilk, TestStatistic,
};
use crate::workbook::WorkbookSink;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What happened to a recorded parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Tested {
        test: SelectedTest,
        pvalue: f64,
        statistic: f64,
    },
    /// The test failed and failure isolation is enabled
    Skipped { reason: String },
}

/// Summary of one dataset, labelled by group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSummary {
    pub group: String,
    pub summary: SampleSummary,
}

/// One row of a behavior's result table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub parameter: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summaries: Vec<LabeledSummary>,
}

impl ResultRow {
    pub fn pvalue(&self) -> Option<f64> {
        match self.outcome {
            RowOutcome::Tested { pvalue, .. } => Some(pvalue),
            RowOutcome::Skipped { .. } => None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        match self.outcome {
            RowOutcome::Tested { statistic, .. } => Some(statistic),
            RowOutcome::Skipped { .. } => None,
        }
    }

    pub fn test(&self) -> Option<SelectedTest> {
        match self.outcome {
            RowOutcome::Tested { test, .. } => Some(test),
            RowOutcome::Skipped { .. } => None,
        }
    }
}

/// Post-hoc output for one recorded parameter (console only, never persisted)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocReport {
    pub parameter: String,
    pub result: PostHocResult,
}

/// Results for one behavior: one table row per recorded parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorReport {
    pub behavior: String,
    pub rows: Vec<ResultRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub post_hoc: Vec<PostHocReport>,
}

impl BehaviorReport {
    pub fn row(&self, parameter: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.parameter == parameter)
    }

    pub fn post_hoc_for(&self, parameter: &str) -> Option<&PostHocResult> {
        self.post_hoc
            .iter()
            .find(|p| p.parameter == parameter)
            .map(|p| &p.result)
    }
}

/// Results of a full run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub path: AnalysisPath,
    pub behaviors: Vec<BehaviorReport>,
}

impl AnalysisReport {
    pub fn behavior(&self, name: &str) -> Option<&BehaviorReport> {
        self.behaviors.iter().find(|b| b.behavior == name)
    }

    /// Total recorded rows across all behaviors
    pub fn recorded_rows(&self) -> usize {
        self.behaviors.iter().map(|b| b.rows.len()).sum()
    }
}

/// Per-parameter result before it is folded into a behavior report
struct ParameterOutcome {
    row: ResultRow,
    post_hoc: Option<PostHocResult>,
}

/// Test selector over a fixed set of groups
pub struct Analyzer<'a, N = ShapiroWilk> {
    groups: &'a [Group],
    control: Option<&'a Group>,
    config: &'a AnalysisConfig,
    normality: N,
}

impl<'a> Analyzer<'a, ShapiroWilk> {
    /// Create an analyzer using the Shapiro-Wilk normality gate
    pub fn new(
        groups: &'a [Group],
        control: Option<&'a Group>,
        config: &'a AnalysisConfig,
    ) -> Result<Self> {
        config.validate().map_err(AnalysisError::Config)?;

        if groups.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "at least one group is required".to_string(),
            ));
        }
        if groups.len() + usize::from(control.is_some()) < 2 {
            return Err(AnalysisError::InvalidInput(
                "need at least two groups (or one group and a control) to compare".to_string(),
            ));
        }

        Ok(Self {
            groups,
            control,
            config,
            normality: ShapiroWilk,
        })
    }
}

impl<'a, N: NormalityTest> Analyzer<'a, N> {
    /// Swap the per-sample normality test
    pub fn with_normality_test<M: NormalityTest>(self, normality: M) -> Analyzer<'a, M> {
        Analyzer {
            groups: self.groups,
            control: self.control,
            config: self.config,
            normality,
        }
    }

    pub fn path(&self) -> AnalysisPath {
        select_path(self.groups.len(), self.control.is_some())
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    /// Behaviors of the first group, in order
    pub fn behaviors(&self) -> &'a [Behavior] {
        self.groups[0].behaviors()
    }

    /// Analyse every behavior
    pub fn run(&self) -> Result<AnalysisReport> {
        let behaviors = self
            .behaviors()
            .iter()
            .map(|b| self.analyze_behavior(b))
            .collect::<Result<Vec<_>>>()?;

        Ok(AnalysisReport {
            path: self.path(),
            behaviors,
        })
    }

    /// Analyse one behavior: every parameter, recording rule applied
    pub fn analyze_behavior(&self, behavior: &Behavior) -> Result<BehaviorReport> {
        tracing::debug!("analysing behavior '{}' via {:?}", behavior.name, self.path());

        let outcomes = behavior
            .parameter_names()
            .map(|parameter| self.analyze_parameter(&behavior.name, parameter))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::new();
        let mut post_hoc = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            if let Some(result) = outcome.post_hoc {
                post_hoc.push(PostHocReport {
                    parameter: outcome.row.parameter.clone(),
                    result,
                });
            }
            rows.push(outcome.row);
        }

        Ok(BehaviorReport {
            behavior: behavior.name.clone(),
            rows,
            post_hoc,
        })
    }

    /// Run one parameter, isolating failures when configured
    fn analyze_parameter(&self, behavior: &str, parameter: &str) -> Result<Option<ParameterOutcome>> {
        let attempt = match self.path() {
            AnalysisPath::TwoGroup => self.two_group_parameter(behavior, parameter),
            AnalysisPath::MultiGroup => self.multi_group_parameter(behavior, parameter),
        };

        match attempt {
            Err(e) if self.config.skip_failed_tests && e.is_isolatable() => {
                tracing::warn!("skipping {}/{}: {}", behavior, parameter, e);
                Ok(Some(ParameterOutcome {
                    row: ResultRow {
                        parameter: parameter.to_string(),
                        outcome: RowOutcome::Skipped {
                            reason: e.to_string(),
                        },
                        summaries: Vec::new(),
                    },
                    post_hoc: None,
                }))
            }
            other => other,
        }
    }

    /// Samples for one parameter, control first, missing values dropped
    fn datasets(&self, behavior: &str, parameter: &str) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
        self.control
            .into_iter()
            .chain(self.groups.iter())
            .map(|group| {
                group
                    .sample(behavior, parameter)
                    .map(|sample| (group.name.clone(), Sample::observed(sample)))
            })
            .collect::<Result<Vec<_>>>()
            .map(|pairs| pairs.into_iter().unzip())
    }

    fn summaries(&self, labels: &[String], datasets: &[Vec<f64>]) -> Result<Vec<LabeledSummary>> {
        if !self.config.describe {
            return Ok(Vec::new());
        }
        labels
            .iter()
            .zip(datasets)
            .map(|(group, data)| {
                Ok(LabeledSummary {
                    group: group.clone(),
                    summary: summarize(data)?,
                })
            })
            .collect()
    }

    fn two_group_parameter(&self, behavior: &str, parameter: &str) -> Result<Option<ParameterOutcome>> {
        let (labels, datasets) = self.datasets(behavior, parameter)?;
        let (a, b) = (&datasets[0], &datasets[1]);

        let normal = all_normal(&self.normality, &datasets, self.config.normality_alpha)?;
        let test = select_two_group_test(normal, self.config.paired);
        tracing::debug!("{}/{}: normal={} -> {}", behavior, parameter, normal, test.name());

        let result = match test {
            TwoGroupTest::PairedT => parametric::paired_t_test(a, b)?,
            TwoGroupTest::UnpairedT => parametric::unpaired_t_test(a, b)?,
            TwoGroupTest::WilcoxonSignedRank => nonparametric::wilcoxon_signed_rank(a, b)?,
            TwoGroupTest::MannWhitneyU => nonparametric::mann_whitney_u(a, b)?,
        };

        if !should_record(
            result.pvalue,
            self.config.significance_level,
            self.config.report_all,
        ) {
            return Ok(None);
        }

        Ok(Some(ParameterOutcome {
            row: self.row(
                parameter,
                SelectedTest::TwoGroup(test),
                result,
                self.summaries(&labels, &datasets)?,
            ),
            post_hoc: None,
        }))
    }

    fn multi_group_parameter(
        &self,
        behavior: &str,
        parameter: &str,
    ) -> Result<Option<ParameterOutcome>> {
        let (labels, datasets) = self.datasets(behavior, parameter)?;

        let normal = all_normal(&self.normality, &datasets, self.config.normality_alpha)?;
        let test = select_multi_group_test(normal, self.config.paired);
        tracing::debug!("{}/{}: normal={} -> {}", behavior, parameter, normal, test.name());

        let result = match test {
            MultiGroupTest::Anova => parametric::one_way_anova(&datasets)?,
            MultiGroupTest::Friedman => nonparametric::friedman(&datasets)?,
            MultiGroupTest::KruskalWallis => nonparametric::kruskal_wallis(&datasets)?,
        };

        if !should_record(
            result.pvalue,
            self.config.significance_level,
            self.config.report_all,
        ) {
            return Ok(None);
        }

        let procedure = select_post_hoc(test, self.control.is_some());
        let post_hoc = match self.post_hoc(procedure, &labels, &datasets) {
            Ok(result) => Some(result),
            Err(e) if self.config.skip_failed_tests && e.is_isolatable() => {
                tracing::warn!(
                    "{} post-hoc failed for {}/{}: {}",
                    procedure.name(),
                    behavior,
                    parameter,
                    e
                );
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Some(ParameterOutcome {
            row: self.row(
                parameter,
                SelectedTest::MultiGroup(test),
                result,
                self.summaries(&labels, &datasets)?,
            ),
            post_hoc,
        }))
    }

    fn post_hoc(
        &self,
        procedure: PostHocProcedure,
        labels: &[String],
        datasets: &[Vec<f64>],
    ) -> Result<PostHocResult> {
        match procedure {
            PostHocProcedure::TukeyHsd => posthoc::tukey_hsd(labels, datasets),
            PostHocProcedure::Dunnett => posthoc::dunnett(labels, datasets),
            PostHocProcedure::Dunn => posthoc::dunn(labels, datasets),
        }
    }

    fn row(
        &self,
        parameter: &str,
        test: SelectedTest,
        result: TestStatistic,
        summaries: Vec<LabeledSummary>,
    ) -> ResultRow {
        ResultRow {
            parameter: parameter.to_string(),
            outcome: RowOutcome::Tested {
                test,
                pvalue: result.pvalue,
                statistic: result.statistic,
            },
            summaries,
        }
    }
}

/// Run the analysis, tracing each behavior to `trace` and writing one sheet
/// per behavior to `<output_dir>/<output_file_name>`
///
/// The workbook is finalized when this returns, on success and on failure.
pub fn run_to_workbook<N: NormalityTest, W: Write>(
    analyzer: &Analyzer<'_, N>,
    output_dir: &Path,
    trace: &mut W,
) -> Result<(AnalysisReport, PathBuf)> {
    let mut sink = WorkbookSink::create(output_dir, &analyzer.config().output_file_name)?;

    let mut behaviors = Vec::with_capacity(analyzer.behaviors().len());
    for behavior in analyzer.behaviors() {
        let report = analyzer.analyze_behavior(behavior)?;
        trace.write_all(report::render_behavior(&report).as_bytes())?;
        sink.write_behavior(&report)?;
        behaviors.push(report);
    }

    let path = sink.finish()?;
    tracing::debug!("results written to {}", path.display());

    Ok((
        AnalysisReport {
            path: analyzer.path(),
            behaviors,
        },
        path,
    ))
}
