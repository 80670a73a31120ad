//! End-to-end analysis scenarios through the library API
//!
//! Covers path choice, row and sheet ordering, the recording rule and the
//! post-hoc procedures on realistic group layouts.

mod utils;

use statmine::analysis::{run_to_workbook, Analyzer};
use statmine::selection::{
    AnalysisPath, MultiGroupTest, PostHocProcedure, SelectedTest, TwoGroupTest,
};
use calamine::{open_workbook, Data, Reader, Xlsx};
use statmine::{AnalysisConfig, AnalysisError, Group};
use tempfile::TempDir;
use utils::{group, normal_scores, skewed};

const BEHAVIORS: [&str; 5] = ["grooming", "rearing", "walking", "freezing", "sniffing"];
const PARAMETERS: [&str; 3] = ["duration", "count", "latency"];

/// Two groups, 5 behaviors x 3 parameters; only walking/count and
/// sniffing/latency are shifted upward in the second group
fn two_group_layout() -> Vec<Group> {
    let shifted = |b: &str, p: &str| (b, p) == ("walking", "count") || (b, p) == ("sniffing", "latency");

    let build = |name: &str, second: bool| {
        let behaviors = BEHAVIORS
            .iter()
            .enumerate()
            .map(|(bi, b)| {
                let parameters = PARAMETERS
                    .iter()
                    .enumerate()
                    .map(|(pi, p)| {
                        let mean = 10.0 + (bi * 3 + pi) as f64;
                        let mut values = normal_scores(12, mean, 1.0);
                        if second {
                            values.reverse();
                            if shifted(*b, *p) {
                                values.iter_mut().for_each(|v| *v += 2.5);
                            }
                        }
                        (p.to_string(), values)
                    })
                    .collect();
                (b.to_string(), parameters)
            })
            .collect();
        group(name, behaviors)
    };

    vec![build("wildtype", false), build("knockout", true)]
}

#[test]
fn test_two_group_significant_only_records_shifted_parameters() {
    let groups = two_group_layout();
    let config = AnalysisConfig {
        report_all: false,
        ..AnalysisConfig::default()
    };
    let analyzer = Analyzer::new(&groups, None, &config).unwrap();
    assert_eq!(analyzer.path(), AnalysisPath::TwoGroup);

    let report = analyzer.run().unwrap();
    assert_eq!(report.behaviors.len(), 5);
    assert_eq!(report.recorded_rows(), 2);

    for (behavior, parameter) in [("walking", "count"), ("sniffing", "latency")] {
        let row = report.behavior(behavior).unwrap().row(parameter).unwrap();
        assert_eq!(
            row.test(),
            Some(SelectedTest::TwoGroup(TwoGroupTest::UnpairedT))
        );
        assert!(row.pvalue().unwrap() <= 0.05);
        // A - B with B shifted up
        assert!(row.statistic().unwrap() < 0.0);
    }
    assert!(report
        .behaviors
        .iter()
        .all(|b| b.post_hoc.is_empty()));
}

#[test]
fn test_two_group_report_all_keeps_parameter_order() {
    let groups = two_group_layout();
    let config = AnalysisConfig::default();
    let report = Analyzer::new(&groups, None, &config).unwrap().run().unwrap();

    let behaviors: Vec<&str> = report.behaviors.iter().map(|b| b.behavior.as_str()).collect();
    assert_eq!(behaviors, BEHAVIORS);
    for behavior in &report.behaviors {
        let parameters: Vec<&str> = behavior.rows.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(parameters, PARAMETERS);
    }
    assert_eq!(report.recorded_rows(), 15);
}

#[test]
fn test_two_group_workbook_and_trace() {
    let groups = two_group_layout();
    let config = AnalysisConfig::default();
    let analyzer = Analyzer::new(&groups, None, &config).unwrap();
    let dir = TempDir::new().unwrap();
    let mut trace = Vec::new();

    let (report, path) = run_to_workbook(&analyzer, dir.path(), &mut trace).unwrap();

    assert_eq!(path, dir.path().join("data_mining_results.xlsx"));
    assert!(path.exists());
    assert_eq!(report.behaviors.len(), BEHAVIORS.len());

    // read the file back: one sheet per behavior, parameters down column A
    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), BEHAVIORS);
    for behavior in &report.behaviors {
        let range = workbook.worksheet_range(&behavior.behavior).unwrap();
        assert_eq!(range.get_value((0, 0)).unwrap_or(&Data::Empty), &Data::Empty);
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("p-value".into())));
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("statistic".into())));

        for (index, row) in behavior.rows.iter().enumerate() {
            let line = index as u32 + 1;
            assert_eq!(
                range.get_value((line, 0)),
                Some(&Data::String(PARAMETERS[index].into()))
            );
            assert_eq!(range.get_value((line, 1)), Some(&Data::Float(row.pvalue().unwrap())));
            assert_eq!(
                range.get_value((line, 2)),
                Some(&Data::Float(row.statistic().unwrap()))
            );
        }
        assert_eq!(range.height(), PARAMETERS.len() + 1);
    }

    let trace = String::from_utf8(trace).unwrap();
    assert!(trace.starts_with("grooming\n\t duration\n\t performing unpaired t-test\n"));
    let positions: Vec<usize> = BEHAVIORS
        .iter()
        .map(|b| trace.find(&format!("{}\n", b)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_paired_two_group_uses_paired_t() {
    let base = normal_scores(10, 20.0, 2.0);
    let after: Vec<f64> = base.iter().enumerate().map(|(i, v)| v + 1.0 + 0.1 * (i % 3) as f64).collect();
    let groups = vec![
        group("before", vec![("walking".into(), vec![("speed".into(), base)])]),
        group("after", vec![("walking".into(), vec![("speed".into(), after)])]),
    ];
    let config = AnalysisConfig {
        paired: true,
        ..AnalysisConfig::default()
    };
    let report = Analyzer::new(&groups, None, &config).unwrap().run().unwrap();
    let row = report.behavior("walking").unwrap().row("speed").unwrap();
    assert_eq!(row.test(), Some(SelectedTest::TwoGroup(TwoGroupTest::PairedT)));
    assert!(row.pvalue().unwrap() < 0.001);
}

/// Four skewed groups and a skewed control; only "count" differs
fn control_layout() -> (Vec<Group>, Group) {
    let parameters = |offset: f64| {
        vec![
            ("duration".to_string(), skewed(15, 1.0, 2.0)),
            ("count".to_string(), skewed(15, 1.0 + offset, 2.0)),
        ]
    };
    let groups = (0..4)
        .map(|i| {
            let offset = if i == 2 { 30.0 } else { 0.0 };
            group(
                &format!("line{}", i + 1),
                vec![("rearing".to_string(), parameters(offset))],
            )
        })
        .collect();
    let control = group("control", vec![("rearing".to_string(), parameters(0.0))]);
    (groups, control)
}

#[test]
fn test_control_non_normal_uses_kruskal_wallis_and_dunn() {
    let (groups, control) = control_layout();
    let config = AnalysisConfig {
        report_all: false,
        ..AnalysisConfig::default()
    };
    let analyzer = Analyzer::new(&groups, Some(&control), &config).unwrap();
    assert_eq!(analyzer.path(), AnalysisPath::MultiGroup);

    let report = analyzer.run().unwrap();
    let rearing = report.behavior("rearing").unwrap();

    assert!(rearing.row("duration").is_none());
    assert!(rearing.post_hoc_for("duration").is_none());

    let row = rearing.row("count").unwrap();
    assert_eq!(
        row.test(),
        Some(SelectedTest::MultiGroup(MultiGroupTest::KruskalWallis))
    );
    assert!(row.pvalue().unwrap() <= 0.05);

    let post_hoc = rearing.post_hoc_for("count").unwrap();
    assert_eq!(post_hoc.procedure, PostHocProcedure::Dunn);
    assert_eq!(
        post_hoc.labels,
        vec!["control", "line1", "line2", "line3", "line4"]
    );
    // all pairs, control included as an ordinary group
    assert_eq!(post_hoc.comparisons.len(), 10);
    let shifted = post_hoc.pvalue("control", "line3").unwrap();
    let unshifted = post_hoc.pvalue("control", "line1").unwrap();
    assert!(shifted < 0.05);
    assert!(unshifted > 0.5);
}

#[test]
fn test_control_normal_uses_anova_and_dunnett() {
    let build = |name: &str, shift: f64| {
        group(
            name,
            vec![(
                "freezing".to_string(),
                vec![("time".to_string(), normal_scores(12, 50.0 + shift, 4.0))],
            )],
        )
    };
    let groups = vec![build("a", 0.0), build("b", 12.0), build("c", 0.5)];
    let control = build("vehicle", 0.0);
    let config = AnalysisConfig::default();
    let report = Analyzer::new(&groups, Some(&control), &config)
        .unwrap()
        .run()
        .unwrap();

    let freezing = report.behavior("freezing").unwrap();
    assert_eq!(
        freezing.row("time").unwrap().test(),
        Some(SelectedTest::MultiGroup(MultiGroupTest::Anova))
    );
    let post_hoc = freezing.post_hoc_for("time").unwrap();
    assert_eq!(post_hoc.procedure, PostHocProcedure::Dunnett);
    assert_eq!(post_hoc.comparisons.len(), 3);
    assert!(post_hoc.pvalue("b", "vehicle").unwrap() < 0.001);
    assert!(post_hoc.pvalue("a", "vehicle").unwrap() > 0.5);
}

#[test]
fn test_three_groups_normal_uses_tukey() {
    let build = |name: &str, shift: f64| {
        group(
            name,
            vec![(
                "sniffing".to_string(),
                vec![("bouts".to_string(), normal_scores(10, 5.0 + shift, 1.0))],
            )],
        )
    };
    let groups = vec![build("x", 0.0), build("y", 0.0), build("z", 3.0)];
    let config = AnalysisConfig::default();
    let report = Analyzer::new(&groups, None, &config).unwrap().run().unwrap();

    let sniffing = report.behavior("sniffing").unwrap();
    let post_hoc = sniffing.post_hoc_for("bouts").unwrap();
    assert_eq!(post_hoc.procedure, PostHocProcedure::TukeyHsd);
    assert_eq!(post_hoc.comparisons.len(), 3);
    assert!(post_hoc.pvalue("x", "z").unwrap() < 0.001);
    assert!(post_hoc.pvalue("x", "y").unwrap() > 0.9);
}

#[test]
fn test_paired_non_normal_multi_group_uses_friedman() {
    let build = |name: &str, shift: f64| {
        group(
            name,
            vec![(
                "walking".to_string(),
                vec![("distance".to_string(), skewed(12, shift, 1.0))],
            )],
        )
    };
    let groups = vec![build("t0", 0.0), build("t1", 0.5), build("t2", 1.0)];
    let config = AnalysisConfig {
        paired: true,
        ..AnalysisConfig::default()
    };
    let report = Analyzer::new(&groups, None, &config).unwrap().run().unwrap();
    let walking = report.behavior("walking").unwrap();
    let row = walking.row("distance").unwrap();
    assert_eq!(
        row.test(),
        Some(SelectedTest::MultiGroup(MultiGroupTest::Friedman))
    );
    // every block ranks t0 < t1 < t2
    assert!(row.pvalue().unwrap() < 0.001);
    assert_eq!(
        walking.post_hoc_for("distance").unwrap().procedure,
        PostHocProcedure::Dunn
    );
}

#[test]
fn test_missing_parameter_in_later_group_is_schema_mismatch() {
    let groups = vec![
        group(
            "a",
            vec![("walking".into(), vec![("speed".into(), normal_scores(8, 1.0, 1.0))])],
        ),
        group(
            "b",
            vec![("walking".into(), vec![("pace".into(), normal_scores(8, 1.0, 1.0))])],
        ),
    ];
    let config = AnalysisConfig::default();
    let dir = TempDir::new().unwrap();
    let analyzer = Analyzer::new(&groups, None, &config).unwrap();
    let err = run_to_workbook(&analyzer, dir.path(), &mut Vec::new()).unwrap_err();
    match err {
        AnalysisError::SchemaMismatch { group, what } => {
            assert_eq!(group, "b");
            assert!(what.contains("speed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
