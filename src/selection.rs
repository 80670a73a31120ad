// Test selection decision logic
//
// Pure functions over {group count, control present, normality, pairing}.
// Each decision returns a tagged variant that the analysis paths consume with
// an explicit match; nothing downstream branches on test names.

use serde::Serialize;
use std::fmt;

/// Which analysis path a dataset goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisPath {
    /// Exactly two groups and no designated control
    TwoGroup,
    /// Three or more groups, or any design with a control
    MultiGroup,
}

/// Choose the analysis path from the number of (non-control) groups
pub fn select_path(group_count: usize, has_control: bool) -> AnalysisPath {
    if group_count == 2 && !has_control {
        AnalysisPath::TwoGroup
    } else {
        AnalysisPath::MultiGroup
    }
}

/// Primary test for the two-group path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TwoGroupTest {
    PairedT,
    UnpairedT,
    WilcoxonSignedRank,
    MannWhitneyU,
}

impl TwoGroupTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PairedT => "paired t-test",
            Self::UnpairedT => "unpaired t-test",
            Self::WilcoxonSignedRank => "Wilcoxon test",
            Self::MannWhitneyU => "Mann Whitney U test",
        }
    }
}

/// | normal | paired | test |
/// |---|---|---|
/// | yes | yes | paired t-test |
/// | yes | no | unpaired t-test |
/// | no | yes | Wilcoxon signed-rank |
/// | no | no | Mann-Whitney U |
pub fn select_two_group_test(normal: bool, paired: bool) -> TwoGroupTest {
    match (normal, paired) {
        (true, true) => TwoGroupTest::PairedT,
        (true, false) => TwoGroupTest::UnpairedT,
        (false, true) => TwoGroupTest::WilcoxonSignedRank,
        (false, false) => TwoGroupTest::MannWhitneyU,
    }
}

/// Primary (omnibus) test for the multi-group path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MultiGroupTest {
    Anova,
    Friedman,
    KruskalWallis,
}

impl MultiGroupTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anova => "ANOVA",
            Self::Friedman => "Friedman",
            Self::KruskalWallis => "Kruskal Wallis",
        }
    }
}

/// Normal data always goes to one-way ANOVA, paired or not
pub fn select_multi_group_test(normal: bool, paired: bool) -> MultiGroupTest {
    match (normal, paired) {
        (true, _) => MultiGroupTest::Anova,
        (false, true) => MultiGroupTest::Friedman,
        (false, false) => MultiGroupTest::KruskalWallis,
    }
}

/// Follow-up procedure after a recorded omnibus result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostHocProcedure {
    TukeyHsd,
    Dunnett,
    Dunn,
}

impl PostHocProcedure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TukeyHsd => "Tukey HSD",
            Self::Dunnett => "Dunnett's",
            Self::Dunn => "Dunn's",
        }
    }
}

/// ANOVA is followed by Tukey (all pairs) or Dunnett (vs. control); the rank tests by Dunn
///
/// Dunn always compares all pairs, even when a control is designated.
pub fn select_post_hoc(test: MultiGroupTest, has_control: bool) -> PostHocProcedure {
    match test {
        MultiGroupTest::Anova if has_control => PostHocProcedure::Dunnett,
        MultiGroupTest::Anova => PostHocProcedure::TukeyHsd,
        MultiGroupTest::Friedman | MultiGroupTest::KruskalWallis => PostHocProcedure::Dunn,
    }
}

/// Recording rule: keep a result when reporting everything or when p <= alpha
pub fn should_record(pvalue: f64, alpha: f64, report_all: bool) -> bool {
    report_all || pvalue <= alpha
}

/// Either kind of primary test, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SelectedTest {
    TwoGroup(TwoGroupTest),
    MultiGroup(MultiGroupTest),
}

impl SelectedTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TwoGroup(t) => t.name(),
            Self::MultiGroup(t) => t.name(),
        }
    }
}

impl fmt::Display for SelectedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
