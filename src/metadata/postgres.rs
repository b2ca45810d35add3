use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use super::{ConflictKind, MetadataError, MetadataResult, MetadataStore};
use crate::db::PgPool;
use crate::models::{
    Assignment, Document, Facility, FacilityChangeset, NewAssignment, NewDocument, NewFacility,
    Profile, Role,
};
use crate::schema::{assignments, documents, facilities, profiles};

const ASSIGNMENT_UNIQUE: &str = "assignments_one_per_facility";
const ACTIVE_DOCUMENT_UNIQUE: &str = "documents_one_active_per_facility";

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> MetadataResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| MetadataError::Backend(format!("database pool error: {err}")))
    }
}

impl From<DieselError> for MetadataError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let kind = match info.constraint_name() {
                    Some(ASSIGNMENT_UNIQUE) => ConflictKind::Assignment,
                    Some(ACTIVE_DOCUMENT_UNIQUE) => ConflictKind::ActiveDocument,
                    Some(other) => ConflictKind::Other(other.to_string()),
                    None => ConflictKind::Other(info.message().to_string()),
                };
                MetadataError::Conflict(kind)
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                MetadataError::MissingReference(
                    info.constraint_name()
                        .unwrap_or_else(|| info.message())
                        .to_string(),
                )
            }
            other => MetadataError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn profile(&self, identity_id: Uuid) -> MetadataResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .find(identity_id)
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    async fn list_profiles(&self, role: Role) -> MetadataResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::role.eq(role.as_str()))
            .order(profiles::created_at.desc())
            .load(&mut conn)?)
    }

    async fn insert_facility(&self, facility: NewFacility) -> MetadataResult<Facility> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(facilities::table)
            .values(&facility)
            .get_result(&mut conn)?)
    }

    async fn update_facility(
        &self,
        facility_id: Uuid,
        changes: FacilityChangeset,
    ) -> MetadataResult<Facility> {
        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();
        diesel::update(facilities::table.find(facility_id))
            .set((&changes, facilities::updated_at.eq(now)))
            .get_result(&mut conn)
            .optional()?
            .ok_or(MetadataError::NotFound("facility"))
    }

    async fn facility(&self, facility_id: Uuid) -> MetadataResult<Option<Facility>> {
        let mut conn = self.conn()?;
        Ok(facilities::table
            .find(facility_id)
            .first::<Facility>(&mut conn)
            .optional()?)
    }

    async fn list_facilities(&self, active_only: bool) -> MetadataResult<Vec<Facility>> {
        let mut conn = self.conn()?;
        let mut query = facilities::table.into_boxed();
        if active_only {
            query = query.filter(facilities::active.eq(true));
        }
        Ok(query.order(facilities::name.asc()).load(&mut conn)?)
    }

    async fn delete_facility(&self, facility_id: Uuid) -> MetadataResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(facilities::table.find(facility_id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn has_assignment(&self, facility_id: Uuid) -> MetadataResult<bool> {
        let mut conn = self.conn()?;
        Ok(diesel::select(exists(
            assignments::table.filter(assignments::facility_id.eq(facility_id)),
        ))
        .get_result(&mut conn)?)
    }

    async fn insert_assignment(&self, assignment: NewAssignment) -> MetadataResult<Assignment> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(assignments::table)
            .values(&assignment)
            .get_result(&mut conn)?)
    }

    async fn assignment_for_identity(
        &self,
        identity_id: Uuid,
    ) -> MetadataResult<Option<Assignment>> {
        let mut conn = self.conn()?;
        Ok(assignments::table
            .filter(assignments::identity_id.eq(identity_id))
            .order(assignments::created_at.asc())
            .first::<Assignment>(&mut conn)
            .optional()?)
    }

    async fn assignment_for_facility(
        &self,
        facility_id: Uuid,
    ) -> MetadataResult<Option<Assignment>> {
        let mut conn = self.conn()?;
        Ok(assignments::table
            .filter(assignments::facility_id.eq(facility_id))
            .first::<Assignment>(&mut conn)
            .optional()?)
    }

    async fn list_assignments(&self) -> MetadataResult<Vec<Assignment>> {
        let mut conn = self.conn()?;
        Ok(assignments::table
            .order(assignments::created_at.desc())
            .load(&mut conn)?)
    }

    async fn delete_assignments_for_identity(&self, identity_id: Uuid) -> MetadataResult<usize> {
        let mut conn = self.conn()?;
        Ok(
            diesel::delete(assignments::table.filter(assignments::identity_id.eq(identity_id)))
                .execute(&mut conn)?,
        )
    }

    async fn delete_assignments_for_facility(&self, facility_id: Uuid) -> MetadataResult<usize> {
        let mut conn = self.conn()?;
        Ok(
            diesel::delete(assignments::table.filter(assignments::facility_id.eq(facility_id)))
                .execute(&mut conn)?,
        )
    }

    async fn has_active_document(&self, facility_id: Uuid) -> MetadataResult<bool> {
        let mut conn = self.conn()?;
        Ok(diesel::select(exists(
            documents::table
                .filter(documents::facility_id.eq(facility_id))
                .filter(documents::active.eq(true)),
        ))
        .get_result(&mut conn)?)
    }

    async fn insert_document(&self, document: NewDocument) -> MetadataResult<Document> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(documents::table)
            .values(&document)
            .get_result(&mut conn)?)
    }

    async fn document(&self, document_id: Uuid) -> MetadataResult<Option<Document>> {
        let mut conn = self.conn()?;
        Ok(documents::table
            .find(document_id)
            .first::<Document>(&mut conn)
            .optional()?)
    }

    async fn active_documents(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>> {
        let mut conn = self.conn()?;
        Ok(documents::table
            .filter(documents::facility_id.eq(facility_id))
            .filter(documents::active.eq(true))
            .order(documents::created_at.asc())
            .load(&mut conn)?)
    }

    async fn documents_for_facility(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>> {
        let mut conn = self.conn()?;
        Ok(documents::table
            .filter(documents::facility_id.eq(facility_id))
            .order(documents::created_at.desc())
            .load(&mut conn)?)
    }

    async fn documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<Vec<Document>> {
        let mut conn = self.conn()?;
        Ok(documents::table
            .filter(documents::uploaded_by.eq(identity_id))
            .order(documents::created_at.asc())
            .load(&mut conn)?)
    }

    async fn delete_document(&self, document_id: Uuid) -> MetadataResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(documents::table.find(document_id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn delete_documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<usize> {
        let mut conn = self.conn()?;
        Ok(
            diesel::delete(documents::table.filter(documents::uploaded_by.eq(identity_id)))
                .execute(&mut conn)?,
        )
    }

    async fn delete_documents_for_facility(
        &self,
        facility_id: Uuid,
    ) -> MetadataResult<Vec<Document>> {
        let mut conn = self.conn()?;
        Ok(
            diesel::delete(documents::table.filter(documents::facility_id.eq(facility_id)))
                .get_results(&mut conn)?,
        )
    }
}
