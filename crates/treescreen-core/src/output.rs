//! Report writers, classification-table I/O and result assembly.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;

use crate::config::{
    NonredundantClade, ProblematicLabel, ScreenConfig, ScreenResult, Status, TableRow,
    TreeClades, TreeClassification,
};
use crate::error::{Result, ScreenError};
use crate::phases::problematic::ProblematicTable;

pub const SUSPICIOUS_REPORT: &str = "suspicious.txt";
pub const PROBLEMATIC_REPORT: &str = "problematic_orgs.json";
pub const RESULT_FILE: &str = "treescreen.json";
pub const BACKPROPAGATION_FILE: &str = "treescreen_backpropagation.json";

/// Summary file for a run; backpropagation keeps the screening summary intact.
pub fn result_file(backpropagate: bool) -> &'static str {
    if backpropagate {
        BACKPROPAGATION_FILE
    } else {
        RESULT_FILE
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ScreenError::io(parent, e))?;
        }
    }
    std::fs::write(path, contents).map_err(|e| ScreenError::io(path, e))
}

// ---------------------------------------------------------------------------
// Classification tables
// ---------------------------------------------------------------------------

/// Render rows as `name<TAB>group<TAB>status` lines.
pub fn format_table(rows: &[TableRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "{}\t{}\t{}", row.name, row.group, row.status.code());
    }
    out
}

pub fn write_table(rows: &[TableRow], path: &Path) -> Result<()> {
    write_file(path, &format_table(rows))
}

pub fn parse_table(text: &str, source: &str) -> Result<Vec<TableRow>> {
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let malformed = |message: String| ScreenError::MalformedRow {
            file: source.to_string(),
            line: i + 1,
            message,
        };
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 3 {
            return Err(malformed(format!("expected 3 columns, found {}", cols.len())));
        }
        let code = cols[2].trim();
        let status =
            Status::from_code(code).ok_or_else(|| malformed(format!("unknown status '{code}'")))?;
        rows.push(TableRow {
            name: cols[0].to_string(),
            group: cols[1].to_string(),
            status,
        });
    }
    Ok(rows)
}

pub fn read_table(path: &Path) -> Result<Vec<TableRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| ScreenError::io(path, e))?;
    parse_table(&text, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Text report listing the suspicious clades of every tree that has any.
pub fn format_suspicious_report(results: &[TreeClades]) -> String {
    let mut out = String::new();
    for result in results.iter().filter(|r| !r.clades.is_empty()) {
        let _ = writeln!(out, "{}", result.tree);
        let _ = writeln!(out, "========================");
        for clade in &result.clades {
            let _ = writeln!(out, "[{}]", clade.join(", "));
        }
        out.push_str("\n\n\n");
    }
    out
}

pub fn write_suspicious_report(results: &[TreeClades], path: &Path) -> Result<()> {
    write_file(path, &format_suspicious_report(results))
}

/// JSON input for bar-chart rendering: per-organism labels and group colors.
pub fn write_problematic(
    problematic: &BTreeMap<String, Vec<ProblematicLabel>>,
    group_colors: &BTreeMap<String, String>,
    path: &Path,
) -> Result<()> {
    let json = serde_json::to_string_pretty(&serde_json::json!({
        "problematic": problematic,
        "group_colors": group_colors,
    }))?;
    write_file(path, &json)
}

/// Write the run result as pretty JSON.
pub fn write_output(result: &ScreenResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    write_file(path, &json)
}

/// Write every report of a finished run into the output folder.
pub fn write_reports(result: &ScreenResult, config: &ScreenConfig) -> Result<()> {
    let folder = Path::new(&config.output_folder);
    if !config.backpropagate && !result.suspicious.is_empty() {
        write_suspicious_report(&result.suspicious, &folder.join(SUSPICIOUS_REPORT))?;
        write_problematic(
            &result.problematic,
            &result.group_colors,
            &folder.join(PROBLEMATIC_REPORT),
        )?;
    }
    write_output(result, &folder.join(result_file(config.backpropagate)))
}

// ---------------------------------------------------------------------------
// Result assembly
// ---------------------------------------------------------------------------

/// Stage outputs gathered by the pipeline.
pub struct RunOutputs {
    pub tree_count: usize,
    pub suspicious: Vec<TreeClades>,
    pub nonredundant: Vec<NonredundantClade>,
    pub problematic: ProblematicTable,
    pub group_colors: BTreeMap<String, String>,
    pub classifications: Vec<TreeClassification>,
}

/// Build the ScreenResult from stage outputs.
pub fn build_result(
    config: &ScreenConfig,
    outputs: RunOutputs,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> ScreenResult {
    let mut metadata = HashMap::new();
    metadata.insert(
        "trees_folder".to_string(),
        serde_json::Value::String(config.trees_folder.clone()),
    );
    metadata.insert(
        "output_folder".to_string(),
        serde_json::Value::String(config.output_folder.clone()),
    );
    metadata.insert(
        "mode".to_string(),
        serde_json::json!(if config.backpropagate {
            "backpropagate"
        } else {
            "screen"
        }),
    );
    metadata.insert(
        "analysed_at".to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "treescreen_version".to_string(),
        serde_json::Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    metadata.insert(
        "analysis_duration_ms".to_string(),
        serde_json::json!(((total_ms * 10.0).round() / 10.0)),
    );
    metadata.insert(
        "phase_timings".to_string(),
        serde_json::to_value(timings).unwrap_or_default(),
    );

    let suspicious_count: usize = outputs.suspicious.iter().map(|r| r.clades.len()).sum();
    let contaminant_count: usize = outputs
        .classifications
        .iter()
        .map(|c| c.contaminants.len())
        .sum();

    let mut stats = HashMap::new();
    stats.insert("trees".to_string(), serde_json::json!(outputs.tree_count));
    stats.insert(
        "suspicious_clades".to_string(),
        serde_json::json!(suspicious_count),
    );
    stats.insert(
        "nonredundant_clades".to_string(),
        serde_json::json!(outputs.nonredundant.len()),
    );
    stats.insert(
        "problematic_organisms".to_string(),
        serde_json::json!(outputs.problematic.len()),
    );
    stats.insert(
        "contaminants".to_string(),
        serde_json::json!(contaminant_count),
    );

    ScreenResult {
        version: "1.0".to_string(),
        metadata,
        stats,
        suspicious: outputs.suspicious,
        nonredundant: outputs.nonredundant,
        problematic: outputs.problematic.into_entries(),
        group_colors: outputs.group_colors,
        classifications: outputs.classifications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<TableRow> {
        vec![
            TableRow {
                name: "Org a_120@A".to_string(),
                group: "Alpha".to_string(),
                status: Status::Original,
            },
            TableRow {
                name: "Org x_l_{2}_q@X".to_string(),
                group: "Alpha".to_string(),
                status: Status::Contaminant,
            },
        ]
    }

    #[test]
    fn table_text_roundtrip() {
        let text = format_table(&rows());
        assert_eq!(text, "Org a_120@A\tAlpha\to\nOrg x_l_{2}_q@X\tAlpha\td\n");
        assert_eq!(parse_table(&text, "t.tsv").unwrap(), rows());
    }

    #[test]
    fn unknown_status_is_fatal() {
        let err = parse_table("Org a_1@A\tAlpha\tz\n", "t.tsv").unwrap_err();
        assert!(matches!(err, ScreenError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn suspicious_report_skips_clean_trees() {
        let report = format_suspicious_report(&[
            TreeClades {
                tree: "trees/a.tre".to_string(),
                clades: vec![vec!["A_1".to_string(), "C_1".to_string()]],
            },
            TreeClades {
                tree: "trees/b.tre".to_string(),
                clades: Vec::new(),
            },
        ]);
        assert!(report.starts_with("trees/a.tre\n====="));
        assert!(report.contains("[A_1, C_1]"));
        assert!(!report.contains("b.tre"));
    }

    #[test]
    fn build_result_stats() {
        let mut problematic = ProblematicTable::new();
        problematic.record("A", ProblematicLabel::Unspecified);
        let outputs = RunOutputs {
            tree_count: 2,
            suspicious: vec![TreeClades {
                tree: "t".to_string(),
                clades: vec![vec!["A_1".to_string(), "C_1".to_string()]],
            }],
            nonredundant: Vec::new(),
            problematic,
            group_colors: BTreeMap::new(),
            classifications: Vec::new(),
        };
        let result = build_result(&ScreenConfig::default(), outputs, &HashMap::new(), 12.34);
        assert_eq!(result.stats["trees"], serde_json::json!(2));
        assert_eq!(result.stats["suspicious_clades"], serde_json::json!(1));
        assert_eq!(result.stats["problematic_organisms"], serde_json::json!(1));
        assert!(result.metadata.contains_key("analysed_at"));
        assert_eq!(result.metadata["mode"], serde_json::json!("screen"));
    }

    #[test]
    fn backpropagation_summary_keeps_screen_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScreenConfig {
            output_folder: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let screen = ScreenResult {
            suspicious: vec![TreeClades {
                tree: "t".to_string(),
                clades: vec![vec!["A_1".to_string(), "C_1".to_string()]],
            }],
            ..Default::default()
        };
        write_reports(&screen, &config).unwrap();

        config.backpropagate = true;
        write_reports(&ScreenResult::default(), &config).unwrap();

        let kept = std::fs::read_to_string(dir.path().join(RESULT_FILE)).unwrap();
        assert!(kept.contains("A_1"));
        assert!(dir.path().join(BACKPROPAGATION_FILE).exists());
    }

    #[test]
    fn write_output_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(RESULT_FILE);
        write_output(&ScreenResult::default(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"version\": \"1.0\""));
    }
}
