//! Editor session: the one mutable copy of a configuration and its
//! Clean / Dirty / Saving lifecycle.
//!
//! ```text
//!   Clean --edit--> Dirty --begin_save--> Saving --ok--> Clean
//!                     ^                     |
//!                     +-------failed--------+
//! ```
//!
//! Editing while a save is in flight is allowed; the save then lands in
//! `Dirty` because the in-memory copy no longer matches what was written.
//! A second save while `Saving` is rejected, not queued. Auto-save is a
//! caller-side timer that calls [`EditorSession::save`] like a manual save.

use crate::catalog::{self, CatalogResolver, MetafieldStore, ResolvedProduct};
use crate::configuration::Configuration;
use crate::discount::DiscountType;
use crate::error::ReconcileError;
use crate::merge::{MergeResult, PickResult};
use crate::pipeline::{self, LookupOptions};
use crate::serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Dirty,
    Saving,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    configuration: Configuration,
    persisted: Configuration,
    in_flight: Option<Configuration>,
    state: SessionState,
    /// Type applied to records added from now on.
    pub global_discount_type: DiscountType,
}

impl EditorSession {
    /// Starts a clean session over an already persisted configuration.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            persisted: configuration.clone(),
            configuration,
            in_flight: None,
            state: SessionState::Clean,
            global_discount_type: DiscountType::Percentage,
        }
    }

    /// Starts a session from the stored metafield value.
    ///
    /// A malformed value falls back to an empty configuration labelled
    /// `discount_code`; the decode error is returned alongside so the caller
    /// can tell the merchant the saved configuration could not be loaded.
    #[must_use]
    pub fn hydrate(stored: Option<&str>, discount_code: &str) -> (Self, Option<ReconcileError>) {
        let Some(json) = stored else {
            return (Self::new(Configuration::new(discount_code)), None);
        };
        match serialize::deserialize(json) {
            Ok(mut config) => {
                if config.discount_code.is_empty() {
                    config.discount_code = discount_code.to_owned();
                }
                (Self::new(config), None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "falling back to an empty configuration");
                (Self::new(Configuration::new(discount_code)), Some(err))
            }
        }
    }

    /// Reads the metafield and hydrates a session from it. A malformed
    /// value falls back to an empty configuration as in [`Self::hydrate`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::LoadFailed`] when the store cannot be read;
    /// no session is built.
    pub async fn load<S>(
        store: &S,
        discount_code: &str,
    ) -> Result<(Self, Option<ReconcileError>), ReconcileError>
    where
        S: MetafieldStore + Sync,
    {
        let stored = store.read().await.map_err(|e| {
            tracing::warn!(error = %e, "could not read saved configuration");
            ReconcileError::LoadFailed {
                source: Box::new(e),
            }
        })?;
        Ok(Self::hydrate(stored.as_deref(), discount_code))
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The last configuration known to be persisted.
    #[must_use]
    pub fn persisted(&self) -> &Configuration {
        &self.persisted
    }

    fn mark_dirty(&mut self) {
        if self.state == SessionState::Clean {
            self.state = SessionState::Dirty;
        }
    }

    /// Sets a record's value (clamped into its type's bound).
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRecord`] for an unknown identifier.
    pub fn set_value(&mut self, identifier: &str, value: f64) -> Result<f64, ReconcileError> {
        let stored = self.configuration.set_value(identifier, value)?;
        self.mark_dirty();
        Ok(stored)
    }

    /// Changes a record's discount type.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRecord`] for an unknown identifier.
    pub fn set_type(&mut self, identifier: &str, discount_type: DiscountType) -> Result<(), ReconcileError> {
        self.configuration.set_type(identifier, discount_type)?;
        self.mark_dirty();
        Ok(())
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRecord`] for an unknown identifier.
    pub fn remove(&mut self, identifier: &str) -> Result<(), ReconcileError> {
        self.configuration
            .remove(identifier)
            .ok_or_else(|| ReconcileError::UnknownRecord(identifier.to_owned()))?;
        self.mark_dirty();
        Ok(())
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        if !self.configuration.is_empty() {
            self.configuration.clear();
            self.mark_dirty();
        }
    }

    /// Adds product-picker selections at value `0` with the global type.
    pub fn add_picked(&mut self, selection: &[ResolvedProduct]) -> PickResult {
        let records = catalog::picked_records(selection, self.global_discount_type);
        let (merged, result) = crate::merge::add_picked(&self.configuration, records);
        if result.added > 0 {
            self.configuration = merged;
            self.mark_dirty();
        }
        result
    }

    /// Runs a bulk import with the session's global discount type. On any
    /// error the configuration is left exactly as it was.
    ///
    /// # Errors
    ///
    /// See [`pipeline::bulk_import`].
    pub async fn bulk_import<R>(
        &mut self,
        raw: &str,
        resolver: &R,
        options: LookupOptions,
    ) -> Result<MergeResult, ReconcileError>
    where
        R: CatalogResolver + Sync,
    {
        let (merged, result) = pipeline::bulk_import(
            &self.configuration,
            raw,
            self.global_discount_type,
            resolver,
            options,
        )
        .await?;
        if result.changed() {
            self.configuration = merged;
            self.mark_dirty();
        }
        Ok(result)
    }

    /// Re-resolves SKU records that have no catalog data (legacy loads).
    /// Display-only; does not make the session dirty.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::CatalogLookupFailed`] if the lookup fails.
    pub async fn refresh_details<R>(
        &mut self,
        resolver: &R,
        options: LookupOptions,
    ) -> Result<usize, ReconcileError>
    where
        R: CatalogResolver + Sync,
    {
        let skus = self.configuration.unresolved_skus();
        if skus.is_empty() {
            return Ok(0);
        }
        let products =
            catalog::resolve_in_chunks(resolver, &skus, options.chunk_size, options.concurrency)
                .await?;
        let refreshed = catalog::refresh_details(&mut self.configuration, &products);
        catalog::refresh_details(&mut self.persisted, &products);
        Ok(refreshed)
    }

    /// Discards local edits and returns to the last persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::SaveInProgress`] while a save is in flight.
    pub fn reset(&mut self) -> Result<(), ReconcileError> {
        if self.state == SessionState::Saving {
            return Err(ReconcileError::SaveInProgress);
        }
        self.configuration = self.persisted.clone();
        self.state = SessionState::Clean;
        Ok(())
    }

    /// Enters `Saving` and returns the JSON to persist.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::SaveInProgress`] if already saving.
    /// - [`ReconcileError::PersistFailed`] if encoding fails (state unchanged).
    pub fn begin_save(&mut self) -> Result<String, ReconcileError> {
        if self.state == SessionState::Saving {
            return Err(ReconcileError::SaveInProgress);
        }
        let json = serialize::to_json(&self.configuration)?;
        self.in_flight = Some(self.configuration.clone());
        self.state = SessionState::Saving;
        Ok(json)
    }

    /// Leaves `Saving`. On success the written snapshot becomes the persisted
    /// version; on failure local edits are kept and the session is `Dirty`.
    pub fn finish_save(&mut self, succeeded: bool) {
        if self.state != SessionState::Saving {
            return;
        }
        let written = self.in_flight.take();
        if succeeded {
            if let Some(written) = written {
                self.persisted = written;
            }
            self.state = if self.configuration == self.persisted {
                SessionState::Clean
            } else {
                SessionState::Dirty
            };
        } else {
            self.state = SessionState::Dirty;
        }
    }

    /// Serializes and writes the configuration through `store`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::SaveInProgress`] if a save is already in flight.
    /// - [`ReconcileError::PersistFailed`] if the store rejects the write; the
    ///   session stays `Dirty` with its edits intact.
    pub async fn save<S>(&mut self, store: &S) -> Result<(), ReconcileError>
    where
        S: MetafieldStore + Sync,
    {
        let json = self.begin_save()?;
        match store.write(&json).await {
            Ok(()) => {
                self.finish_save(true);
                tracing::info!(records = self.persisted.len(), "saved discount configuration");
                Ok(())
            }
            Err(err) => {
                self.finish_save(false);
                tracing::warn!(error = %err, "saving discount configuration failed");
                Err(ReconcileError::PersistFailed {
                    source: Box::new(err),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
