//! `startstop plan`: show the stages a run would walk.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::manifest::Manifest;

use super::render;

pub async fn handle_plan(path: &Path, json: bool) -> Result<()> {
    let manifest = Manifest::load(path)
        .await
        .with_context(|| format!("cannot load manifest {}", path.display()))?;
    let tree = manifest.to_tree();
    let stages = tree.plan();

    if json {
        let out = serde_json::json!({
            "steps": tree.step_count(),
            "stop_order": manifest.settings.stop_order,
            "stages": stages,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} step(s) in {} stage(s)",
        style("Plan").bold(),
        style(tree.step_count()).cyan(),
        stages.len()
    );
    println!();
    if stages.is_empty() {
        println!("  {}", style("No steps declared.").dim());
    } else {
        println!("{}", render::plan_table(&stages));
    }
    println!();
    Ok(())
}
