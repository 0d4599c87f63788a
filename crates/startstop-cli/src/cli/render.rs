//! Terminal rendering for plans and lifecycle events.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use startstop_core::Stage;
use startstop_types::{FailureSet, LifecycleEvent, RunReport};

/// Flatten `stages` into table rows labelled `1`, `2`, `2.1`, ...
fn plan_rows(stages: &[Stage], prefix: &str, rows: &mut Vec<(String, &'static str, String)>) {
    for (index, stage) in stages.iter().enumerate() {
        let label = if prefix.is_empty() {
            format!("{}", index + 1)
        } else {
            format!("{prefix}.{}", index + 1)
        };
        match stage {
            Stage::Batch(names) => rows.push((label, "batch", names.join(", "))),
            Stage::Group(inner) => {
                rows.push((label.clone(), "group", format!("{} step(s)", stage.step_count())));
                plan_rows(inner, &label, rows);
            }
        }
    }
}

pub fn plan_table(stages: &[Stage]) -> Table {
    let mut rows = Vec::new();
    plan_rows(stages, "", &mut rows);

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Stage").fg(Color::Cyan),
            Cell::new("Kind"),
            Cell::new("Steps"),
        ]);
    for (label, kind, steps) in rows {
        let kind_cell = match kind {
            "group" => Cell::new(kind).fg(Color::Yellow),
            _ => Cell::new(kind),
        };
        table.add_row(vec![Cell::new(label), kind_cell, Cell::new(steps)]);
    }
    table
}

/// Styled one-line description of `event`, if it is worth printing.
///
/// With `quiet`, only failures are rendered.
pub fn event_line(event: &LifecycleEvent, quiet: bool) -> Option<String> {
    let line = match event {
        LifecycleEvent::StepFailed {
            direction,
            step,
            error,
            ..
        } => format!(
            "  {} {} {} failed: {}",
            style("✗").red(),
            style(step).cyan(),
            direction,
            error
        ),
        LifecycleEvent::ActionFailed {
            direction, failures, ..
        } => format!(
            "{} {} failed: {}",
            style("✗").red().bold(),
            direction,
            failures
        ),
        _ if quiet => return None,
        LifecycleEvent::StepBegin { direction, step, .. } => format!(
            "  {} {} {}",
            style("→").dim(),
            style(step).cyan(),
            style(direction.action_name()).dim()
        ),
        LifecycleEvent::StepSucceeded { direction, step, .. } => format!(
            "  {} {} {}",
            style("✓").green(),
            style(step).cyan(),
            direction.finish_name()
        ),
        LifecycleEvent::Started { .. } => format!("{} all steps started", style("●").green().bold()),
        LifecycleEvent::Stopped { .. } => format!("{} all steps stopped", style("○").bold()),
        _ => return None,
    };
    Some(line)
}

/// One JSON line per event.
pub fn event_json(event: &LifecycleEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn failure_summary(failures: &FailureSet) -> String {
    let mut out = format!(
        "{} {} step(s) failed",
        style("✗").red().bold(),
        failures.len()
    );
    for outcome in failures.failures() {
        out.push_str(&format!("\n    {}: {}", style(&outcome.step).cyan(), outcome.error));
    }
    out
}

pub fn report_line(report: &RunReport) -> String {
    let status = if report.succeeded() {
        style("ok").green().to_string()
    } else {
        style("failed").red().to_string()
    };
    format!(
        "  {} run {} {} in {}ms",
        report.direction,
        style(report.run_id.to_string().chars().take(8).collect::<String>()).dim(),
        status,
        report.duration_ms()
    )
}
