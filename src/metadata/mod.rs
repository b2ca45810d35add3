//! Relational metadata store: profiles, facilities, assignments and document rows.
//!
//! The store enforces the two per-facility uniqueness invariants itself (one assignment, one
//! active document) and reports violations as [`MetadataError::Conflict`], which makes the
//! guarded inserts atomic check-and-write operations.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Assignment, Document, Facility, FacilityChangeset, NewAssignment, NewDocument, NewFacility,
    Profile, Role,
};

mod postgres;

pub use postgres::PgMetadataStore;

/// Which uniqueness rule a rejected write ran into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ActiveDocument,
    Assignment,
    Other(String),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("uniqueness conflict: {0:?}")]
    Conflict(ConflictKind),
    #[error("referenced row does not exist ({0})")]
    MissingReference(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("metadata store failure: {0}")]
    Backend(String),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn profile(&self, identity_id: Uuid) -> MetadataResult<Option<Profile>>;

    async fn list_profiles(&self, role: Role) -> MetadataResult<Vec<Profile>>;

    async fn insert_facility(&self, facility: NewFacility) -> MetadataResult<Facility>;

    async fn update_facility(
        &self,
        facility_id: Uuid,
        changes: FacilityChangeset,
    ) -> MetadataResult<Facility>;

    async fn facility(&self, facility_id: Uuid) -> MetadataResult<Option<Facility>>;

    /// Facilities ordered by name.
    async fn list_facilities(&self, active_only: bool) -> MetadataResult<Vec<Facility>>;

    /// Returns whether a row was removed.
    async fn delete_facility(&self, facility_id: Uuid) -> MetadataResult<bool>;

    async fn has_assignment(&self, facility_id: Uuid) -> MetadataResult<bool>;

    /// Fails with [`ConflictKind::Assignment`] when the facility already has an assignment.
    async fn insert_assignment(&self, assignment: NewAssignment) -> MetadataResult<Assignment>;

    async fn assignment_for_identity(&self, identity_id: Uuid)
        -> MetadataResult<Option<Assignment>>;

    async fn assignment_for_facility(&self, facility_id: Uuid)
        -> MetadataResult<Option<Assignment>>;

    async fn list_assignments(&self) -> MetadataResult<Vec<Assignment>>;

    async fn delete_assignments_for_identity(&self, identity_id: Uuid) -> MetadataResult<usize>;

    async fn delete_assignments_for_facility(&self, facility_id: Uuid) -> MetadataResult<usize>;

    async fn has_active_document(&self, facility_id: Uuid) -> MetadataResult<bool>;

    /// Fails with [`ConflictKind::ActiveDocument`] when an active row already exists for the
    /// facility and the new row is active.
    async fn insert_document(&self, document: NewDocument) -> MetadataResult<Document>;

    async fn document(&self, document_id: Uuid) -> MetadataResult<Option<Document>>;

    /// Active rows for a facility, oldest first.
    async fn active_documents(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>>;

    /// All rows for a facility, newest first.
    async fn documents_for_facility(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>>;

    async fn documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<Vec<Document>>;

    async fn delete_document(&self, document_id: Uuid) -> MetadataResult<bool>;

    async fn delete_documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<usize>;

    /// Removes every row for the facility and returns the removed rows.
    async fn delete_documents_for_facility(
        &self,
        facility_id: Uuid,
    ) -> MetadataResult<Vec<Document>>;
}
