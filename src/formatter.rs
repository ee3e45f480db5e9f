//! Report rendering: table, JSON, TSV and Markdown.

use serde::{Deserialize, Serialize};
use tabwriter::TabWriter;

use std::io::Write;

use crate::{JobProfile, ProfilerError, ProfilerResult, TaskStepProfile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Tsv,
    Markdown,
}

impl clap::ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Table, Self::Json, Self::Tsv, Self::Markdown]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Table => clap::builder::PossibleValue::new("table"),
            Self::Json => clap::builder::PossibleValue::new("json"),
            Self::Tsv => clap::builder::PossibleValue::new("tsv"),
            Self::Markdown => clap::builder::PossibleValue::new("markdown"),
        })
    }
}

/// Which columns the tabular formats print.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldFilter {
    only: Option<Vec<String>>,
    exclude: Vec<String>,
    hide_percentiles: bool,
}

impl FieldFilter {
    pub fn new(only: Option<Vec<String>>, exclude: Vec<String>, hide_percentiles: bool) -> Self {
        Self {
            only,
            exclude,
            hide_percentiles,
        }
    }

    pub fn show_all() -> Self {
        Self::default()
    }

    pub fn only(fields: Vec<String>) -> Self {
        Self::new(Some(fields), Vec::new(), false)
    }

    pub fn exclude(fields: Vec<String>) -> Self {
        Self::new(None, fields, false)
    }

    pub fn exclude_percentiles() -> Self {
        Self::new(None, Vec::new(), true)
    }

    pub fn shows(&self, field: &str) -> bool {
        if self.hide_percentiles && is_percentile_field(field) {
            return false;
        }
        if self.exclude.iter().any(|f| f == field) {
            return false;
        }
        self.only
            .as_ref()
            .is_none_or(|only| only.iter().any(|f| f == field))
    }

    /// Every named field must be a column of the report.
    pub fn validate(&self, ladder: &[u8]) -> ProfilerResult<()> {
        let known = column_names(ladder);
        let named = self.only.iter().flatten().chain(self.exclude.iter());
        for field in named {
            if !known.iter().any(|k| k == field) {
                return Err(ProfilerError::Config(format!(
                    "unknown field {field:?}; available: {}",
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn is_percentile_field(field: &str) -> bool {
    field
        .strip_prefix('p')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn column_names(ladder: &[u8]) -> Vec<String> {
    let mut names: Vec<String> = ["number", "count", "min", "median", "mean"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    names.extend(ladder.iter().map(|p| format!("p{p}")));
    names.push("max".to_string());
    names.push("name".to_string());
    names
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Number,
    Count,
    Min,
    Median,
    Mean,
    Percentile(u8),
    Max,
    Name,
}

impl Column {
    fn key(self) -> String {
        match self {
            Self::Percentile(p) => format!("p{p}"),
            other => other.header().to_lowercase(),
        }
    }

    fn header(self) -> String {
        match self {
            Self::Number => "Number".to_string(),
            Self::Count => "Count".to_string(),
            Self::Min => "Min".to_string(),
            Self::Median => "Median".to_string(),
            Self::Mean => "Mean".to_string(),
            Self::Percentile(p) => format!("P{p}"),
            Self::Max => "Max".to_string(),
            Self::Name => "Name".to_string(),
        }
    }

    fn cell(self, profile: &TaskStepProfile) -> String {
        match self {
            Self::Number => profile.number.to_string(),
            Self::Count => profile.count.to_string(),
            Self::Min => seconds(profile.min),
            Self::Median => seconds(profile.median),
            Self::Mean => seconds(profile.mean),
            Self::Percentile(p) => profile.percentile(p).map(seconds).unwrap_or_default(),
            Self::Max => seconds(profile.max),
            Self::Name => profile.name.clone(),
        }
    }
}

fn seconds(value: f64) -> String {
    format!("{value:.6}")
}

fn columns(ladder: &[u8], filter: &FieldFilter) -> Vec<Column> {
    let mut all = vec![
        Column::Number,
        Column::Count,
        Column::Min,
        Column::Median,
        Column::Mean,
    ];
    all.extend(ladder.iter().map(|p| Column::Percentile(*p)));
    all.push(Column::Max);
    all.push(Column::Name);
    all.into_iter().filter(|c| filter.shows(&c.key())).collect()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    profiles: &'a [JobProfile],
}

pub fn write_json(w: &mut dyn Write, report: &[JobProfile]) -> ProfilerResult<()> {
    serde_json::to_writer(&mut *w, &JsonReport { profiles: report })?;
    writeln!(w)?;
    Ok(())
}

pub fn write_tsv(
    w: &mut dyn Write,
    report: &[JobProfile],
    ladder: &[u8],
    filter: &FieldFilter,
) -> ProfilerResult<()> {
    let cols = columns(ladder, filter);
    for job in report {
        writeln!(w, "Job: {}", job.name)?;
        let header: Vec<String> = cols.iter().map(|c| c.header()).collect();
        writeln!(w, "{}", header.join("\t"))?;
        for profile in &job.profile {
            let row: Vec<String> = cols.iter().map(|c| c.cell(profile)).collect();
            writeln!(w, "{}", row.join("\t"))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn write_table(
    w: &mut dyn Write,
    report: &[JobProfile],
    ladder: &[u8],
    filter: &FieldFilter,
    markdown: bool,
) -> ProfilerResult<()> {
    let cols = columns(ladder, filter);
    for job in report {
        let header: Vec<String> = cols.iter().map(|c| c.header()).collect();
        let rows: Vec<Vec<String>> = job
            .profile
            .iter()
            .map(|p| cols.iter().map(|c| c.cell(p)).collect())
            .collect();
        let lines = aligned_rows(&header, &rows)?;
        let Some((header_line, body)) = lines.split_first() else {
            continue;
        };

        if markdown {
            writeln!(w, "# Job: {}", job.name)?;
            writeln!(w)?;
            writeln!(w, "{header_line}")?;
            writeln!(w, "{}", rule(header_line, '|'))?;
            for line in body {
                writeln!(w, "{line}")?;
            }
        } else {
            let border = rule(header_line, '+');
            writeln!(w, "Job: {}", job.name)?;
            writeln!(w, "{border}")?;
            writeln!(w, "{header_line}")?;
            writeln!(w, "{border}")?;
            for line in body {
                writeln!(w, "{line}")?;
            }
            writeln!(w, "{border}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Header first, then one `| a | b |` line per row, columns aligned.
fn aligned_rows(header: &[String], rows: &[Vec<String>]) -> ProfilerResult<Vec<String>> {
    let mut tw = TabWriter::new(Vec::new()).minwidth(0).padding(1);
    for cells in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for cell in cells {
            write!(tw, "| {cell}\t")?;
        }
        writeln!(tw, "|")?;
    }
    let bytes = tw
        .into_inner()
        .map_err(|err| ProfilerError::Io(std::io::Error::other(err.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Dashes under every cell of an aligned line, `joint` at each column edge.
fn rule(aligned: &str, joint: char) -> String {
    aligned
        .chars()
        .map(|c| if c == '|' { joint } else { '-' })
        .collect()
}

pub fn write_with_format(
    w: &mut dyn Write,
    report: &[JobProfile],
    format: OutputFormat,
    ladder: &[u8],
    filter: &FieldFilter,
) -> ProfilerResult<()> {
    match format {
        OutputFormat::Json => write_json(w, report),
        OutputFormat::Table => write_table(w, report, ladder, filter, false),
        OutputFormat::Markdown => write_table(w, report, ladder, filter, true),
        OutputFormat::Tsv => write_tsv(w, report, ladder, filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report() -> Vec<JobProfile> {
        vec![JobProfile {
            name: "build".to_string(),
            profile: vec![TaskStepProfile {
                name: "compile".to_string(),
                number: 1,
                count: 2,
                min: 2.0,
                max: 4.0,
                median: 3.0,
                mean: 3.0,
                percentiles: BTreeMap::from([(50, 3.0), (95, 3.9)]),
            }],
        }]
    }

    fn render(format: OutputFormat, filter: &FieldFilter) -> String {
        let mut out = Vec::new();
        write_with_format(&mut out, &report(), format, &[50, 95], filter).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn json_has_profiles_envelope() {
        let out = render(OutputFormat::Json, &FieldFilter::show_all());
        let doc: serde_json::Value = serde_json::from_str(&out).expect("json");
        let step = &doc["profiles"][0]["profile"][0];
        assert_eq!(doc["profiles"][0]["name"], "build");
        assert_eq!(step["number"], 1);
        assert_eq!(step["min"], 2.0);
        assert_eq!(step["percentiles"]["95"], 3.9);
    }

    #[test]
    fn tsv_rows_follow_header() {
        let out = render(OutputFormat::Tsv, &FieldFilter::show_all());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Job: build");
        assert_eq!(lines[1], "Number\tCount\tMin\tMedian\tMean\tP50\tP95\tMax\tName");
        assert_eq!(
            lines[2],
            "1\t2\t2.000000\t3.000000\t3.000000\t3.000000\t3.900000\t4.000000\tcompile"
        );
    }

    #[test]
    fn table_is_aligned_and_bordered() {
        let out = render(OutputFormat::Table, &FieldFilter::only(vec!["number".into(), "name".into()]));
        let expected = "Job: build\n+--------+---------+\n| Number | Name    |\n+--------+---------+\n| 1      | compile |\n+--------+---------+\n\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn markdown_has_heading_and_separator() {
        let out = render(OutputFormat::Markdown, &FieldFilter::exclude_percentiles());
        assert!(out.starts_with("# Job: build\n\n| Number | Count |"), "{out}");
        assert!(!out.contains("P95"));
        assert!(out.lines().nth(3).is_some_and(|l| l.starts_with("|--------|-------|")), "{out}");
    }

    #[test]
    fn table_columns_widen_to_longest_cell() {
        let mut report = report();
        let mut long = report[0].profile[0].clone();
        long.number = 12;
        long.name = "upload artifacts".to_string();
        report[0].profile.push(long);
        let mut out = Vec::new();
        let filter = FieldFilter::only(vec!["number".into(), "name".into()]);
        write_table(&mut out, &report, &[], &filter, false).expect("render");
        let out = String::from_utf8(out).expect("utf8");
        let expected = "Job: build\n+--------+------------------+\n| Number | Name             |\n+--------+------------------+\n| 1      | compile          |\n| 12     | upload artifacts |\n+--------+------------------+\n\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn exclude_filter_drops_columns() {
        let filter = FieldFilter::exclude(vec!["count".into(), "p50".into()]);
        assert!(!filter.shows("count"));
        assert!(!filter.shows("p50"));
        assert!(filter.shows("p95"));
        assert!(filter.shows("name"));
    }

    #[test]
    fn unknown_filter_field_fails_validation() {
        assert!(FieldFilter::only(vec!["p75".into()]).validate(&[50, 95]).is_err());
        assert!(FieldFilter::exclude(vec!["median".into()]).validate(&[]).is_ok());
    }
}
