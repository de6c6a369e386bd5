//! Two-column replay reports.

pub const LABEL_REPORT_URL: &str = "Report URL:";
pub const LABEL_FUNCTION: &str = "Function:";
pub const LABEL_ARGS: &str = "Function input args:";
pub const LABEL_KWARGS: &str = "Function input kwargs:";
pub const LABEL_PROD_OUTPUTS: &str = "Production function outputs:";
pub const LABEL_DEV_OUTPUTS: &str = "Your function outputs:";
pub const LABEL_EXCEPTION: &str = "Local exception:";
pub const LABEL_MATCHES: &str = "Matching outputs:";

/// Gap between the widest label and the value column.
const COLUMN_GAP: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub label: &'static str,
    pub value: String,
}

impl ReportLine {
    pub fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

/// Render lines as two left-aligned columns.
///
/// Values start at the width of the longest label plus two spaces.
pub fn align_report(lines: &[ReportLine]) -> String {
    let width = lines.iter().map(|line| line.label.len()).max().unwrap_or(0) + COLUMN_GAP;
    lines
        .iter()
        .map(|line| format!("{:<width$}{}", line.label, line.value))
        .collect::<Vec<_>>()
        .join("\n")
}
