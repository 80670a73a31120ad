//! Spreadsheet sink for per-behavior result tables
//!
//! One worksheet per behavior, named after the behavior. Column A holds the
//! parameter names under an empty header cell; columns B and C hold the
//! p-value and the statistic. Post-hoc results are never written here.
//! A workbook without sheets is never saved.

use crate::analysis::{BehaviorReport, RowOutcome};
use crate::error::{AnalysisError, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::io;
use std::path::{Path, PathBuf};

const PVALUE_HEADER: &str = "p-value";
const STATISTIC_HEADER: &str = "statistic";
const SKIPPED: &str = "skipped";

/// Owned workbook for one run
///
/// Call [`WorkbookSink::finish`] to save and observe errors. A sink dropped
/// without `finish` (for example on an early `?` return) still saves what
/// was written so far, logging any failure, unless no sheet was written.
pub struct WorkbookSink {
    workbook: Workbook,
    path: PathBuf,
    header: Format,
    sheets: usize,
    finished: bool,
}

impl WorkbookSink {
    /// Prepare a workbook at `<output_dir>/<file_name>`
    ///
    /// The directory must already exist.
    pub fn create(output_dir: &Path, file_name: &str) -> Result<Self> {
        if !output_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("output directory not found: {}", output_dir.display()),
            )
            .into());
        }

        Ok(Self {
            workbook: Workbook::new(),
            path: output_dir.join(file_name),
            header: Format::new().set_bold(),
            sheets: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sheets written so far
    pub fn sheet_count(&self) -> usize {
        self.sheets
    }

    /// Add the sheet for one behavior
    ///
    /// The sheet joins the workbook only once its name is accepted and its
    /// table is complete.
    pub fn write_behavior(&mut self, report: &BehaviorReport) -> Result<()> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&report.behavior)?;
        write_table(&mut worksheet, &self.header, report)?;
        self.workbook.push_worksheet(worksheet);
        self.sheets += 1;
        tracing::debug!(
            "sheet '{}' written with {} rows",
            report.behavior,
            report.rows.len()
        );
        Ok(())
    }

    /// Save the workbook and return its path
    ///
    /// Fails without touching the filesystem when no behavior was written.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.finished = true;
        if self.sheets == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "no behaviors to write, {} not saved",
                self.path.display()
            )));
        }
        self.workbook.save(&self.path)?;
        Ok(self.path.clone())
    }
}

impl Drop for WorkbookSink {
    fn drop(&mut self) {
        if self.finished || self.sheets == 0 {
            return;
        }
        if let Err(e) = self.workbook.save(&self.path) {
            tracing::warn!(
                "failed to save partial workbook {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

fn write_table(worksheet: &mut Worksheet, header: &Format, report: &BehaviorReport) -> Result<()> {
    worksheet.write_string_with_format(0, 1, PVALUE_HEADER, header)?;
    worksheet.write_string_with_format(0, 2, STATISTIC_HEADER, header)?;

    for (index, row) in report.rows.iter().enumerate() {
        let line = index as u32 + 1;
        worksheet.write_string_with_format(line, 0, &row.parameter, header)?;
        match &row.outcome {
            RowOutcome::Tested {
                pvalue, statistic, ..
            } => {
                write_value(worksheet, line, 1, *pvalue)?;
                write_value(worksheet, line, 2, *statistic)?;
            }
            RowOutcome::Skipped { reason } => {
                worksheet.write_string(line, 1, SKIPPED)?;
                worksheet.write_string(line, 2, reason)?;
            }
        }
    }
    Ok(())
}

/// Non-finite numbers have no cell representation; write them as text
fn write_value(worksheet: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<()> {
    if value.is_finite() {
        worksheet.write_number(row, col, value)?;
    } else {
        worksheet.write_string(row, col, value.to_string())?;
    }
    Ok(())
}
