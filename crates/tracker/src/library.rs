//! Collapses exercise definitions that share a name into a single record.
//!
//! Workout history refers to exercises by name only so deleting a duplicate
//! never orphans anything.

use std::collections::HashMap;

use rusqlite::Connection;
use shared::{
    error::{ResultContext, StoreError},
    model::{ExerciseDefinition, Model},
};
use tracing::{debug, info, instrument};

use crate::errors::ErrorSink;

/// Higher ranks are kept. A definition with muscle groups beats one without,
/// then cardio beats strength
fn keeper_rank(definition: &ExerciseDefinition) -> (bool, bool) {
    (!definition.muscle_groups.is_empty(), definition.is_cardio)
}

/// Every definition that would be deleted to leave one per name.
///
/// Within a group of equal names the earliest of the best ranked definitions
/// is kept, so the result only depends on the order of `definitions`.
pub fn select_duplicates(definitions: &[ExerciseDefinition]) -> Vec<&ExerciseDefinition> {
    let mut groups: Vec<Vec<&ExerciseDefinition>> = Vec::new();
    let mut group_of_name: HashMap<&str, usize> = HashMap::new();

    for definition in definitions {
        let index = *group_of_name.entry(definition.name.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(definition);
    }

    let mut duplicates = Vec::new();
    for group in groups.into_iter().filter(|g| g.len() > 1) {
        let mut keeper = 0;
        for (i, candidate) in group.iter().enumerate().skip(1) {
            if keeper_rank(candidate) > keeper_rank(group[keeper]) {
                keeper = i;
            }
        }
        debug!(name = %group[keeper].name, id = %group[keeper].id, dropped = group.len() - 1, "Keeping");

        duplicates.extend(
            group
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != keeper)
                .map(|(_, d)| d),
        );
    }

    duplicates
}

/// Deletes duplicate definitions, returning how many were removed. Failures
/// are reported to the sink and count as nothing removed.
///
/// Safe to run repeatedly but not concurrently with itself.
pub fn deduplicate(conn: &mut Connection, sink: &dyn ErrorSink) -> usize {
    try_deduplicate(conn).unwrap_or_else(|e| {
        sink.report("deduplicate", &e);
        0
    })
}

/// Reads and deletes inside one transaction so a failure leaves the library
/// untouched
#[instrument(skip_all)]
pub fn try_deduplicate(conn: &mut Connection) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;

    let definitions =
        ExerciseDefinition::fetch_all_in_insertion_order(&tx).context("fetch ExerciseDefinitions")?;
    let duplicates = select_duplicates(&definitions);

    let mut deleted = 0;
    for duplicate in &duplicates {
        deleted += ExerciseDefinition::delete_by_id(&tx, &duplicate.id)
            .with_context(|| format!("delete duplicate {:?}", duplicate.name))?;
    }
    tx.commit()?;

    if deleted > 0 {
        info!(deleted, remaining = definitions.len() - deleted, "Deduplicated exercise library");
    }
    Ok(deleted)
}
