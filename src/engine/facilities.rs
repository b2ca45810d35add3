//! Facility records and the public listing.

use tracing::info;
use uuid::Uuid;

use super::gate::{self, Caller};
use super::{documents, EngineError, EngineResult, Stores};
use crate::models::{Document, Facility, FacilityChangeset, NewFacility};

#[derive(Debug, Clone, Default)]
pub struct FacilityInput {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub responsible_person: Option<String>,
    pub operating_hours: Option<String>,
}

/// A facility together with the document it currently publishes.
#[derive(Debug, Clone)]
pub struct PublishedFacility {
    pub facility: Facility,
    pub document: Option<Document>,
}

pub async fn create(
    stores: &Stores,
    caller: &Caller,
    input: FacilityInput,
) -> EngineResult<Facility> {
    gate::require_admin(caller)?;

    let name = required(&input.name, "name")?;
    let address = required(&input.address, "address")?;

    let facility = stores
        .metadata
        .insert_facility(NewFacility {
            id: Uuid::new_v4(),
            name,
            address,
            phone: optional(input.phone),
            email: optional(input.email),
            responsible_person: optional(input.responsible_person),
            operating_hours: optional(input.operating_hours),
            active: true,
            created_by: caller.identity_id,
        })
        .await?;

    info!(facility_id = %facility.id, name = %facility.name, "facility created");
    Ok(facility)
}

pub async fn update(
    stores: &Stores,
    caller: &Caller,
    facility_id: Uuid,
    mut changes: FacilityChangeset,
) -> EngineResult<Facility> {
    gate::require_admin(caller)?;

    if changes.is_empty() {
        return Err(EngineError::Validation("no changes supplied".to_string()));
    }
    if let Some(name) = changes.name.as_deref() {
        changes.name = Some(required(name, "name")?);
    }
    if let Some(address) = changes.address.as_deref() {
        changes.address = Some(required(address, "address")?);
    }
    changes.phone = changes.phone.map(optional);
    changes.email = changes.email.map(optional);
    changes.responsible_person = changes.responsible_person.map(optional);
    changes.operating_hours = changes.operating_hours.map(optional);

    let facility = stores.metadata.update_facility(facility_id, changes).await?;
    info!(facility_id = %facility_id, "facility updated");
    Ok(facility)
}

pub async fn get(stores: &Stores, facility_id: Uuid) -> EngineResult<Facility> {
    stores
        .metadata
        .facility(facility_id)
        .await?
        .ok_or(EngineError::NotFound("facility"))
}

pub async fn list(stores: &Stores, caller: &Caller) -> EngineResult<Vec<Facility>> {
    gate::require_admin(caller)?;
    Ok(stores.metadata.list_facilities(false).await?)
}

/// Active facilities in name order, each with its active document if it has one.
pub async fn published(stores: &Stores) -> EngineResult<Vec<PublishedFacility>> {
    let facilities = stores.metadata.list_facilities(true).await?;
    let mut listing = Vec::with_capacity(facilities.len());
    for facility in facilities {
        let document = documents::active_document(stores, facility.id).await?;
        listing.push(PublishedFacility { facility, document });
    }
    Ok(listing)
}

/// The public URL a facility's QR code points at.
pub async fn published_url(stores: &Stores, facility_id: Uuid) -> EngineResult<String> {
    let facility = get(stores, facility_id).await?;
    if !facility.active {
        return Err(EngineError::NotFound("facility"));
    }
    documents::active_document(stores, facility_id)
        .await?
        .map(|document| document.public_url)
        .ok_or(EngineError::NotFound("active document"))
}

fn required(value: &str, field: &str) -> EngineResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(EngineError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
