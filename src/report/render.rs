//! HTML rendering of the report payload.
//!
//! The payload is the real contract; this renderer builds a single
//! self-contained HTML page from it, section by section. A JSON rendering
//! is available for machine consumers.

use super::{PackageRow, ReportPayload};
use crate::models::{PackageManager, TestOutcome};
use anyhow::Result;

const DATE_FORMAT: &str = "%B %d, %Y";

/// Render the payload as a self-contained HTML document.
pub fn render_html(payload: &ReportPayload) -> String {
    let mut output = String::new();

    output.push_str(HTML_HEADER);

    if let Some(generated) = payload.generated {
        output.push_str(&format!(
            "<h1>Package installation report &mdash; {}</h1>\n",
            generated.format(DATE_FORMAT)
        ));
    } else {
        output.push_str("<h1>Package installation report</h1>\n");
    }

    output.push_str(&render_summary_section(payload));
    output.push_str(&render_package_table(payload));

    output.push_str(HTML_FOOTER);
    output
}

/// Render the payload as pretty-printed JSON.
pub fn render_json(payload: &ReportPayload) -> Result<String> {
    serde_json::to_string_pretty(payload).map_err(Into::into)
}

fn render_summary_section(payload: &ReportPayload) -> String {
    if payload.summary.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("<table class=\"summary\">\n");
    for row in &payload.summary {
        section.push_str("<tr>");
        section.push_str(&format!("<th>{}</th>", escape(&row.label)));
        for value in &row.values {
            section.push_str(&format!("<td>{}</td>", escape(value)));
        }
        if let Some(ref delta) = row.delta {
            section.push_str(&format!("<td class=\"delta\">{}</td>", escape(delta)));
        } else {
            section.push_str("<td></td>");
        }
        section.push_str("</tr>\n");
    }
    section.push_str("</table>\n");
    section
}

fn render_package_table(payload: &ReportPayload) -> String {
    let mut table = String::new();

    table.push_str("<table class=\"package-report\">\n<tr><th>rank</th><th>package</th><th>all distributions</th>");
    for test_name in &payload.test_names {
        table.push_str(&format!("<th>{}</th>", escape(test_name)));
    }
    table.push_str("</tr>\n");

    for (i, package) in payload.packages.iter().enumerate() {
        let odd_even = if (i + 1) % 2 == 0 { "even" } else { "odd" };
        table.push_str(&format!("<tr class=\"package-line {odd_even}\">"));
        table.push_str(&format!("<td class=\"rank\">{}</td>", escape(&package.rank)));
        table.push_str(&format!(
            "<td class=\"package-name\">{}</td>",
            escape(&package.name)
        ));
        table.push_str(&render_distro_cell(package));

        for test_name in &payload.test_names {
            match package.results.get(test_name) {
                Some(outcome) => {
                    table.push_str(&format!(
                        "<td class=\"{}\">{}</td>",
                        manager_class(test_name),
                        render_outcome_cell(package, test_name, outcome)
                    ));
                }
                None => table.push_str("<td></td>"),
            }
        }
        table.push_str("</tr>\n");
    }

    table.push_str("</table>\n");
    table
}

fn render_distro_cell(package: &PackageRow) -> String {
    match package.distro_passing {
        Some(true) => "<td><span class=\"passed badge\">passing option</span></td>".to_string(),
        Some(false) => {
            let mut cell = String::from("<td>");
            if package.failing_distributions.is_empty() {
                cell.push_str("<span class=\"failed badge\">gap</span>");
            } else {
                for distro in &package.failing_distributions {
                    cell.push_str(&format!(
                        "<span class=\"failed badge\">{}</span>",
                        escape(distro)
                    ));
                }
            }
            if let Some(last) = package.distro_last_passing {
                cell.push_str(&last_passing_note(last));
            }
            cell.push_str("</td>");
            cell
        }
        None => "<td></td>".to_string(),
    }
}

fn render_outcome_cell(package: &PackageRow, test_name: &str, outcome: &TestOutcome) -> String {
    let mut cell = String::new();

    if outcome.passed {
        cell.push_str("<span class=\"passed badge\">passed</span>");
    } else {
        cell.push_str("<span class=\"failed badge\">failed</span>");
    }
    if outcome.timed_out {
        cell.push_str(" <span class=\"timeout badge\">timeout</span>");
    }
    if outcome.build_required {
        cell.push_str(" <span class=\"build-required badge\">build required</span>");
    }
    if outcome.slow_install {
        cell.push_str(" <span class=\"slow-install badge\">slow install</span>");
    }
    if let Some(ref version) = outcome.installed_version {
        cell.push_str(&format!(
            " <span class=\"version\">{}</span>",
            escape(version)
        ));
    }
    if let Some(last) = package.last_passing.get(test_name) {
        cell.push_str(&last_passing_note(*last));
    }

    cell
}

fn last_passing_note(last: Option<chrono::NaiveDateTime>) -> String {
    match last {
        Some(date) => format!(
            "<br /><span class=\"file-indicator\">last passed on {}</span>",
            date.format(DATE_FORMAT)
        ),
        None => "<br /><span class=\"file-indicator\">never passed previously</span>".to_string(),
    }
}

fn manager_class(test_name: &str) -> &'static str {
    match PackageManager::from_test_name(test_name) {
        PackageManager::Conda => "package-conda",
        PackageManager::Apt | PackageManager::Yum => "package-os",
        PackageManager::Pip => "package-pip",
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const HTML_HEADER: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8" />
<style type="text/css">
table.package-report td, table.package-report th {
    padding: 5px;
    margin: 5px;
    font-family: monospace;
}
table.package-report span.badge {
    border-radius: 4px;
    margin: 3px;
    padding: 2px;
    color: white;
}
table.package-report span.passed { background: #72aa00; }
table.package-report span.failed { background: #f6290c; }
table.package-report span.timeout,
table.package-report span.build-required,
table.package-report span.slow-install { background: #febf04; }
table.package-report span.version { font-size: smaller; color: #555; }
table.package-report span.file-indicator { font-size: smaller; color: #777; }
table.package-report tr.odd { background-color: #f1f1f1; }
table.summary th { text-align: left; padding: 4px; }
table.summary td { padding: 4px; font-family: monospace; }
table.summary td.delta { font-weight: bold; }
</style>
</head>
<body>
"#;

const HTML_FOOTER: &str = "</body>\n</html>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;
    use crate::ranking::RankTable;
    use crate::report::assemble;
    use crate::series::SnapshotSeries;
    use std::collections::BTreeMap;

    fn payload() -> ReportPayload {
        let ts = chrono::NaiveDateTime::parse_from_str(
            "2024-01-08_00-00-00",
            "%Y-%m-%d_%H-%M-%S",
        )
        .unwrap();
        let mut packages = BTreeMap::new();
        let mut results = crate::models::PackageResults::new();
        results.insert(
            "jammy-pip".to_string(),
            TestOutcome {
                passed: false,
                installed_version: Some("2.1.0".to_string()),
                ..TestOutcome::default()
            },
        );
        packages.insert("numpy".to_string(), results);
        let series = SnapshotSeries::new(vec![Snapshot::new(
            ts,
            "results-2024-01-08_00-00-00.json".to_string(),
            packages,
            true,
        )]);
        assemble(&series, &RankTable::default(), Vec::new())
    }

    #[test]
    fn test_render_html_contains_package_and_badges() {
        let html = render_html(&payload());
        assert!(html.contains("numpy"));
        assert!(html.contains("failed"));
        assert!(html.contains("2.1.0"));
        assert!(html.contains("never passed previously"));
        assert!(html.contains("<span class=\"failed badge\">jammy</span>"));
        assert!(html.contains("January 08, 2024"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let json = render_json(&payload()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["packages"][0]["name"], "numpy");
        assert_eq!(value["packages"][0]["rank"], "~");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn test_manager_class() {
        assert_eq!(manager_class("jammy-apt"), "package-os");
        assert_eq!(manager_class("focal-conda"), "package-conda");
        assert_eq!(manager_class("noble"), "package-pip");
    }
}
