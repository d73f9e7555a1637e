// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch execution
//!
//! Items run one after another and independently of each other. A failing
//! item records [`EXECUTE_FAILED`] in its slot and the batch continues; once
//! every item ran, a single [`BatchUpdateError`] reports all failures together
//! with the per-item counts. Successful items keep their effects.

use crate::exec::error::ExecutionError;
use log::{debug, warn};
use thiserror::Error;

/// Update count of a batch item that failed
pub const EXECUTE_FAILED: i64 = -3;

/// Aggregate error of a batch with at least one failed item
#[derive(Debug, Error)]
#[error(
    "Batch execution failed: {} of {} items failed{}",
    .failures.len(),
    .update_counts.len(),
    describe_failures(.failures)
)]
pub struct BatchUpdateError {
    update_counts: Vec<i64>,
    failures: Vec<(usize, ExecutionError)>,
}

impl BatchUpdateError {
    /// One count per item, [`EXECUTE_FAILED`] for failed items
    pub fn update_counts(&self) -> &[i64] {
        &self.update_counts
    }

    /// Failed items with their errors, in batch order
    pub fn failures(&self) -> &[(usize, ExecutionError)] {
        &self.failures
    }

    pub fn sql_state(&self) -> &'static str {
        self.failures
            .first()
            .map(|(_, err)| err.sql_state())
            .unwrap_or(crate::exec::error::SQLSTATE_GENERAL)
    }
}

fn describe_failures(failures: &[(usize, ExecutionError)]) -> String {
    failures
        .iter()
        .map(|(index, err)| format!("; item {}: {}", index, err))
        .collect()
}

/// Run every item through `execute`, collecting update counts
pub fn run_batch<T, F>(items: Vec<T>, mut execute: F) -> Result<Vec<i64>, BatchUpdateError>
where
    F: FnMut(T) -> Result<i64, ExecutionError>,
{
    let mut update_counts = Vec::with_capacity(items.len());
    let mut failures = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match execute(item) {
            Ok(count) => update_counts.push(count),
            Err(err) => {
                warn!("Batch item {} failed: {}", index, err);
                update_counts.push(EXECUTE_FAILED);
                failures.push((index, err));
            }
        }
    }
    debug!(
        "Batch finished: {} items, {} failed",
        update_counts.len(),
        failures.len()
    );
    if failures.is_empty() {
        Ok(update_counts)
    } else {
        Err(BatchUpdateError {
            update_counts,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_item_does_not_stop_batch() {
        let mut executed = Vec::new();
        let err = run_batch((0..10).collect(), |i: i64| {
            executed.push(i);
            if i == 4 {
                Err(ExecutionError::SyntaxError("bad".into()))
            } else {
                Ok(1)
            }
        })
        .unwrap_err();

        assert_eq!(executed.len(), 10);
        let counts = err.update_counts();
        assert_eq!(counts[4], EXECUTE_FAILED);
        assert_eq!(counts.iter().filter(|c| **c == 1).count(), 9);
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].0, 4);
        assert_eq!(err.sql_state(), "01000");
        assert_eq!(
            err.to_string(),
            "Batch execution failed: 1 of 10 items failed; item 4: Syntax error: bad"
        );
    }

    #[test]
    fn test_empty_batch() {
        let counts = run_batch(Vec::<()>::new(), |_| Ok(0)).unwrap();
        assert!(counts.is_empty());
    }
}
