use chrono::Utc;

use crate::error::Result;
use crate::mirror::Migrator;
use crate::model::{
    BatchResult, DestinationPlan, MigrateOptions, MigrationRecord, MigrationStatus, Outcome,
    SourceRepoRef,
};
use crate::store::state::StateStore;

/// Drives a confirmed batch of migration plans through the executor,
/// persisting every record transition immediately. Sole writer of the
/// state store.
pub struct Orchestrator<'a, M: Migrator> {
    store: &'a mut StateStore,
    executor: &'a M,
    options: MigrateOptions,
}

impl<'a, M: Migrator> Orchestrator<'a, M> {
    pub fn new(store: &'a mut StateStore, executor: &'a M, options: MigrateOptions) -> Self {
        Self {
            store,
            executor,
            options,
        }
    }

    /// Process plans in the operator's confirmed order. One repository's
    /// failure never halts the batch; an auth rejection does, since it would
    /// recur for every remaining repository.
    pub fn run(&mut self, plans: &[(SourceRepoRef, DestinationPlan)]) -> Result<BatchResult> {
        let mut batch = BatchResult::default();

        for (source, plan) in plans {
            let key = source.key();
            let existing = self.store.get(&key).cloned();

            // Completed work is never redone unless explicitly forced.
            if let Some(record) = &existing
                && record.status == MigrationStatus::Succeeded
                && !self.options.force.contains(&key)
            {
                batch.push(record.clone());
                continue;
            }

            if self.options.dry_run {
                if self.preview(source, plan, existing, &mut batch)? {
                    break;
                }
                continue;
            }

            let mut record = existing
                .unwrap_or_else(|| MigrationRecord::new(source.clone(), plan.clone()));
            record.source = source.clone();
            record.destination = plan.clone();
            record.status = MigrationStatus::InProgress;
            record.attempts += 1;
            record.last_error = None;
            record.completed_at = None;
            // Persist before executing: a crash from here on leaves an
            // in_progress record, which the next run re-attempts from scratch.
            self.store.upsert(record.clone())?;

            match self.executor.execute(source, plan) {
                Ok(outcome) => {
                    apply_outcome(&mut record, &outcome);
                    self.store.upsert(record.clone())?;
                    batch.push(record);
                }
                Err(err) => {
                    let halts = err.halts_batch();
                    record.status = MigrationStatus::Failed;
                    record.last_error = Some(err.to_string());
                    self.store.upsert(record.clone())?;
                    batch.push(record);
                    if halts {
                        batch.halted = Some(err.to_string());
                        break;
                    }
                }
            }
        }

        Ok(batch)
    }

    /// Dry run: compute the would-be outcome without writing the store.
    /// Returns true when the batch should halt.
    fn preview(
        &self,
        source: &SourceRepoRef,
        plan: &DestinationPlan,
        existing: Option<MigrationRecord>,
        batch: &mut BatchResult,
    ) -> Result<bool> {
        let mut record =
            existing.unwrap_or_else(|| MigrationRecord::new(source.clone(), plan.clone()));
        record.source = source.clone();
        record.destination = plan.clone();

        match self.executor.execute(source, plan) {
            Ok(outcome) => {
                apply_outcome(&mut record, &outcome);
                record.completed_at = None;
                batch.push(record);
                Ok(false)
            }
            Err(err) => {
                let halts = err.halts_batch();
                record.status = MigrationStatus::Failed;
                record.last_error = Some(err.to_string());
                batch.push(record);
                if halts {
                    batch.halted = Some(err.to_string());
                }
                Ok(halts)
            }
        }
    }
}

fn apply_outcome(record: &mut MigrationRecord, outcome: &Outcome) {
    record.status = outcome.status();
    match outcome {
        Outcome::Succeeded => {
            record.last_error = None;
            record.completed_at = Some(Utc::now());
        }
        Outcome::SkippedNonEmptyDestination => {
            record.last_error = Some(format!(
                "destination {} exists and is not empty",
                record.destination
            ));
        }
        Outcome::Failed(reason) => {
            record.last_error = Some(reason.clone());
        }
    }
}
