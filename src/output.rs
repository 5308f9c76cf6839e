use clap::ValueEnum;
use colored::Colorize;

use crate::error::Result;
use crate::model::{BatchResult, MigrationRecord, MigrationStatus};
use crate::remap::RemapPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn print_record(record: &MigrationRecord, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(record)?),
        Format::Pretty => {
            println!(
                "{} -> {} [{}]",
                record.source,
                record.destination,
                colored_status(record.status)
            );
            println!("  attempts: {}", record.attempts);
            if let Some(ref err) = record.last_error {
                println!("  last error: {err}");
            }
            if let Some(completed_at) = record.completed_at {
                println!("  completed: {completed_at}");
            }
        }
        Format::Minimal => {
            println!(
                "{:12} {} -> {}",
                record.status.to_string(),
                record.source,
                record.destination
            );
        }
    }
    Ok(())
}

pub fn print_records(records: &[&MigrationRecord], format: Format) -> Result<()> {
    match format {
        Format::Json => {
            println!("{}", serde_json::to_string(records)?);
        }
        Format::Pretty => {
            for record in records {
                print_record(record, Format::Pretty)?;
            }
        }
        Format::Minimal => {
            for record in records {
                print_record(record, Format::Minimal)?;
            }
        }
    }
    Ok(())
}

pub fn print_batch(batch: &BatchResult, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(batch)?),
        Format::Pretty => {
            for record in &batch.records {
                print_record(record, Format::Pretty)?;
            }
            println!();
            println!(
                "{} succeeded, {} failed, {} skipped",
                batch.succeeded.to_string().green(),
                batch.failed.to_string().red(),
                batch.skipped.to_string().yellow()
            );
            if let Some(ref reason) = batch.halted {
                println!("{} {reason}", "batch halted:".red().bold());
            }
        }
        Format::Minimal => {
            for record in &batch.records {
                print_record(record, Format::Minimal)?;
            }
            println!(
                "ok={} failed={} skipped={}",
                batch.succeeded, batch.failed, batch.skipped
            );
        }
    }
    Ok(())
}

pub fn print_remap_plan(plan: &RemapPlan, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(plan)?),
        Format::Pretty => {
            if !plan.updates.is_empty() {
                println!("Planned origin updates:");
                for (idx, update) in plan.updates.iter().enumerate() {
                    let state_note = if update.from_state {
                        format!(" {}", "[from state]".green())
                    } else {
                        String::new()
                    };
                    println!("{:3}. {}", idx + 1, update.path.display());
                    println!("     {}{state_note}", update.source_key);
                    println!("     {} -> {}", update.current_origin, update.new_origin);
                    if update.update_pushurl {
                        println!("     pushurl follows origin");
                    }
                }
            }
            if !plan.conflicts.is_empty() {
                println!();
                println!("{}", "Pushurl conflicts (left unchanged):".yellow());
                for conflict in &plan.conflicts {
                    println!(
                        "- {}: {} (wanted {})",
                        conflict.path.display(),
                        conflict.existing_url,
                        conflict.desired_url
                    );
                }
            }
            if !plan.unrecognized.is_empty() {
                println!();
                println!("Not recognized as Bitbucket origins:");
                for (path, url) in &plan.unrecognized {
                    println!("- {}: {url}", path.display());
                }
            }
            if plan.updates.is_empty() && plan.unrecognized.is_empty() {
                println!("No Bitbucket origins found to update.");
            }
        }
        Format::Minimal => {
            for update in &plan.updates {
                println!(
                    "update {} {} -> {}",
                    update.path.display(),
                    update.current_origin,
                    update.new_origin
                );
            }
            for conflict in &plan.conflicts {
                println!("conflict {} {}", conflict.path.display(), conflict.existing_url);
            }
        }
    }
    Ok(())
}

fn colored_status(status: MigrationStatus) -> String {
    let text = status.to_string();
    match status {
        MigrationStatus::Succeeded => text.green().to_string(),
        MigrationStatus::Failed => text.red().to_string(),
        MigrationStatus::Skipped => text.yellow().to_string(),
        MigrationStatus::Pending | MigrationStatus::InProgress => text,
    }
}
