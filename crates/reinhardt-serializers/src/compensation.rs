//! Compensation for partially applied nested writes
//!
//! Every row created by a nested write, and the pre-update state of every row
//! it updated, is recorded in a [`CompensationSet`] owned by one top-level
//! save. When the save fails the set is drained newest first: created rows are
//! deleted and snapshots are saved back.

use reinhardt_db::orm::{Instance, ModelStore, Pk, StoreError};
use std::fmt;

/// One recorded side effect
#[derive(Debug, Clone, PartialEq)]
pub enum CompensationEntry {
	/// A row that did not exist before this save
	Created(Instance),
	/// State of an existing row before this save touched it
	Updated(Instance),
}

/// What compensation tried to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationAction {
	Delete,
	Restore,
}

impl fmt::Display for CompensationAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Delete => f.write_str("delete"),
			Self::Restore => f.write_str("restore"),
		}
	}
}

/// A compensation step that could not be carried out
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} {model} object with primary key {pk}: {error}")]
pub struct CompensationFailure {
	pub model: String,
	pub pk: Pk,
	pub action: CompensationAction,
	#[source]
	pub error: StoreError,
}

/// Side effects of one top-level save, in the order they happened
#[derive(Debug, Default)]
pub struct CompensationSet {
	entries: Vec<CompensationEntry>,
}

impl CompensationSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_created(&mut self, instance: Instance) {
		self.entries.push(CompensationEntry::Created(instance));
	}

	/// Record the state of a row just before it is overwritten
	pub fn record_updated(&mut self, snapshot: Instance) {
		self.entries.push(CompensationEntry::Updated(snapshot));
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[CompensationEntry] {
		&self.entries
	}

	/// Forget every entry; the save succeeded
	pub fn discard(&mut self) {
		self.entries.clear();
	}

	/// Undo recorded side effects, newest first
	///
	/// Each step is attempted once. Failures do not stop the remaining steps
	/// and are returned to the caller. Snapshots are only saved back when
	/// `restore_updated` is set.
	pub async fn compensate(
		&mut self,
		store: &dyn ModelStore,
		restore_updated: bool,
	) -> Vec<CompensationFailure> {
		let entries = std::mem::take(&mut self.entries);
		if entries.is_empty() {
			return Vec::new();
		}
		tracing::warn!(
			entries = entries.len(),
			restore_updated,
			"nested save failed, compensating"
		);

		let mut failures = Vec::new();
		for entry in entries.into_iter().rev() {
			let (instance, action, result) = match entry {
				CompensationEntry::Created(instance) => {
					let result = store.delete(&instance).await;
					(instance, CompensationAction::Delete, result)
				}
				CompensationEntry::Updated(snapshot) => {
					if !restore_updated {
						continue;
					}
					let result = store.save(&snapshot).await;
					(snapshot, CompensationAction::Restore, result)
				}
			};

			match result {
				Ok(()) => {
					tracing::debug!(
						model = instance.model(),
						pk = instance.pk(),
						%action,
						"compensated nested write"
					);
				}
				Err(error) => {
					tracing::error!(
						model = instance.model(),
						pk = instance.pk(),
						%action,
						error = %error,
						"compensation step failed"
					);
					failures.push(CompensationFailure {
						model: instance.model().to_string(),
						pk: instance.pk(),
						action,
						error,
					});
				}
			}
		}
		failures
	}
}
