use crate::selection::{ChangeReason, SelectionEngine, ToggleOutcome};
use crate::setup::App;
use anyhow::{bail, Result};
use quarry_lib::Identifier;
use serde_json::json;

/// `forge:a` selects, `forge:a=off` deselects.
fn parse_toggle(toggle: &str) -> Result<(Identifier, bool)> {
    let (id, desired) = match toggle.rsplit_once('=') {
        Some((id, "on")) => (id, true),
        Some((id, "off")) => (id, false),
        Some((_, other)) => bail!("Unknown toggle state {:?} in {:?}, expected on or off", other, toggle),
        None => (toggle, true),
    };
    Ok((Identifier::parse(id)?, desired))
}

fn describe(outcome: &ToggleOutcome) {
    if outcome.pinned {
        println!("{} is part of the base platform and cannot be deselected", outcome.id);
    }
    if outcome.still_required {
        println!("{} is still required by another selection", outcome.id);
    }
    for change in &outcome.changes {
        let mark = if change.selected { "+" } else { "-" };
        match &change.reason {
            ChangeReason::Requested => println!("{} {}", mark, change.id),
            ChangeReason::Required { by } => println!("{} {} (required by {})", mark, change.id, by),
            ChangeReason::Released => println!("{} {} (no longer required)", mark, change.id),
        }
    }
}

pub fn execute_select(app: &App, toggles: &[String], json: bool) -> Result<()> {
    let mut engine = SelectionEngine::new(&app.catalog);

    let mut outcomes = Vec::with_capacity(toggles.len());
    for toggle in toggles {
        let (id, desired) = parse_toggle(toggle)?;
        let outcome = engine.toggle(&id, desired)?;
        if !json {
            describe(&outcome);
        }
        outcomes.push(outcome);
    }

    let selected: Vec<_> = engine
        .selected()
        .into_iter()
        .map(|id| (id.clone(), engine.reason(id), engine.required_by(id)))
        .collect();

    if json {
        let selected: Vec<_> = selected
            .iter()
            .map(|(id, reason, by)| json!({ "id": id, "reason": reason, "requiredBy": by }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "toggles": outcomes, "selected": selected }))?
        );
        return Ok(());
    }

    println!("Selected:");
    for (id, reason, by) in selected {
        let reason = reason.map(|r| format!("{:?}", r).to_lowercase()).unwrap_or_default();
        if by.is_empty() {
            println!("  {} [{}]", id, reason);
        } else {
            let by: Vec<String> = by.iter().map(|b| b.to_string()).collect();
            println!("  {} [{}] required by {}", id, reason, by.join(", "));
        }
    }
    Ok(())
}
