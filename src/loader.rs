// 💾 Loader - two-phase write: parents, resolve ids by address, then children
//
// Begin → InsertParents → Flush → ResolveIdentifiers → BuildChildRows
//       → InsertChildren → RecordRun → Commit
// Any failure after Begin rolls back and is returned tagged with its phase.

use crate::config::{FlushMode, LoadConfig};
use crate::db::IngestRun;
use crate::entities::{Attached, ChildRecord, PropertyEntity};
use crate::error::{LoadError, LoadPhase, StoreError};
use crate::normalize::NormalizedBatch;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{error, info, warn};

// ============================================================================
// STORE SEAM
// ============================================================================

/// What the loader needs from a relational store.
///
/// Generated ids are always read back by natural key after the parent insert,
/// so implementations do not need RETURNING support.
pub trait PropertyStore {
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Insert-or-skip by address; returns rows actually inserted
    fn insert_properties(&mut self, properties: &[PropertyEntity]) -> Result<usize, StoreError>;

    /// Make inserted parents visible to `resolve_property_ids` within the transaction
    fn flush(&mut self) -> Result<(), StoreError>;

    /// address → property_id, covering at least every address inserted so far
    fn resolve_property_ids(&mut self) -> Result<HashMap<String, i64>, StoreError>;

    /// Insert-or-skip; returns rows actually inserted
    ///
    /// `rows` holds every row of this kind for the run, so identical rows of one
    /// property are inserted once each rather than collapsed.
    fn insert_children<T: ChildRecord>(
        &mut self,
        rows: &[Attached<'_, T>],
    ) -> Result<usize, StoreError>;

    fn record_run(&mut self, run: &IngestRun) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    /// Must be a no-op when no transaction is open
    fn rollback(&mut self) -> Result<(), StoreError>;
}

// ============================================================================
// LOAD REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableLoad {
    pub attempted: usize,
    pub inserted: usize,
}

impl TableLoad {
    /// Rows skipped because they already existed
    pub fn skipped(&self) -> usize {
        self.attempted.saturating_sub(self.inserted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub run: IngestRun,
    pub properties: TableLoad,
    pub valuations: TableLoad,
    pub hoa: TableLoad,
    pub rehab: TableLoad,
    /// Source records whose address had no property id; their children were skipped
    pub unresolved_records: usize,
}

// ============================================================================
// LOADER
// ============================================================================

pub struct Loader<'s, S: PropertyStore> {
    store: &'s mut S,
    config: LoadConfig,
}

impl<'s, S: PropertyStore> Loader<'s, S> {
    pub fn new(store: &'s mut S, config: LoadConfig) -> Self {
        Loader { store, config }
    }

    /// Load one normalized batch. Either everything this call wrote after the
    /// last flush-commit is committed, or none of it is.
    pub fn load(
        &mut self,
        batch: &NormalizedBatch,
        run: IngestRun,
    ) -> Result<LoadReport, LoadError> {
        self.store
            .begin()
            .map_err(|e| LoadError::new(LoadPhase::Begin, e))?;

        match self.load_in_transaction(batch, run) {
            Ok(report) => {
                info!(run_id = %report.run.run_id, "committed all changes");
                Ok(report)
            }
            Err(err) => {
                error!(phase = %err.phase, error = %err.source, "load failed, rolling back");
                if let Err(rollback_err) = self.store.rollback() {
                    error!(error = %rollback_err, "rollback failed");
                } else {
                    info!("rolled back");
                }
                Err(err)
            }
        }
    }

    fn load_in_transaction(
        &mut self,
        batch: &NormalizedBatch,
        mut run: IngestRun,
    ) -> Result<LoadReport, LoadError> {
        // Parents
        let properties = TableLoad {
            attempted: batch.properties.len(),
            inserted: self
                .store
                .insert_properties(&batch.properties)
                .map_err(|e| LoadError::new(LoadPhase::InsertParents, e))?,
        };
        info!(
            inserted = properties.inserted,
            skipped = properties.skipped(),
            "loaded 'properties'"
        );

        self.flush().map_err(|e| LoadError::new(LoadPhase::Flush, e))?;

        let ids = self
            .store
            .resolve_property_ids()
            .map_err(|e| LoadError::new(LoadPhase::ResolveIdentifiers, e))?;
        info!(ids = ids.len(), "mapped addresses to property ids");

        // Child rows
        let mut valuations = Vec::new();
        let mut hoa = Vec::new();
        let mut rehab = Vec::new();
        let mut unresolved_records = 0;

        for children in &batch.children {
            let Some(&property_id) = ids.get(&children.address) else {
                warn!(
                    address = %children.address,
                    "no property id for address, skipping its children"
                );
                unresolved_records += 1;
                continue;
            };
            valuations.extend(children.valuations.iter().map(|v| Attached::new(property_id, v)));
            hoa.extend(children.hoa.iter().map(|h| Attached::new(property_id, h)));
            rehab.extend(children.rehab.iter().map(|r| Attached::new(property_id, r)));
        }

        let valuations = self.insert_child_kind(&valuations)?;
        let hoa = self.insert_child_kind(&hoa)?;
        let rehab = self.insert_child_kind(&rehab)?;

        // Ledger entry commits or rolls back with the data
        run.records = batch.stats.records;
        run.properties_inserted = properties.inserted;
        run.valuations_inserted = valuations.inserted;
        run.hoa_inserted = hoa.inserted;
        run.rehab_inserted = rehab.inserted;
        run.finished_at = Some(Utc::now());
        self.store
            .record_run(&run)
            .map_err(|e| LoadError::new(LoadPhase::RecordRun, e))?;

        info!("committing all changes");
        self.store
            .commit()
            .map_err(|e| LoadError::new(LoadPhase::Commit, e))?;

        Ok(LoadReport {
            run,
            properties,
            valuations,
            hoa,
            rehab,
            unresolved_records,
        })
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        match self.config.flush_mode {
            FlushMode::Transactional => self.store.flush(),
            FlushMode::IntermediateCommit => {
                info!("committing parent rows before resolving ids");
                self.store.commit()?;
                self.store.begin()
            }
        }
    }

    fn insert_child_kind<T: ChildRecord>(
        &mut self,
        rows: &[Attached<'_, T>],
    ) -> Result<TableLoad, LoadError> {
        let table = T::TABLE.as_str();
        if rows.is_empty() {
            info!(table = table, "no rows to load");
            return Ok(TableLoad::default());
        }

        info!(table = table, rows = rows.len(), "loading child rows");
        let inserted = self
            .store
            .insert_children(rows)
            .map_err(|e| LoadError::new(LoadPhase::InsertChildren(T::TABLE), e))?;

        let load = TableLoad {
            attempted: rows.len(),
            inserted,
        };
        info!(
            table = table,
            inserted = load.inserted,
            skipped = load.skipped(),
            "loaded child rows"
        );
        Ok(load)
    }
}
