use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use ubs_docs::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};
use ubs_docs::credentials::{
    normalize_email, CredentialError, CredentialResult, CredentialStore, NewAccount, Session,
};
use ubs_docs::db;
use ubs_docs::engine::gate::Caller;
use ubs_docs::engine::Stores;
use ubs_docs::metadata::{ConflictKind, MetadataError, MetadataResult, MetadataStore};
use ubs_docs::models::{
    Assignment, Document, Facility, FacilityChangeset, NewAssignment, NewDocument, NewFacility,
    Profile, Role,
};
use ubs_docs::routes;
use ubs_docs::state::AppState;
use ubs_docs::storage::{ObjectStorage, ObjectUpload, StorageError, StorageResult};
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const PUBLIC_BASE_URL: &str = "https://storage.test/ubs-documents";

#[derive(Clone)]
struct MemoryIdentity {
    email: String,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    identities: HashMap<Uuid, MemoryIdentity>,
    tokens: HashMap<String, Uuid>,
    profiles: Vec<Profile>,
    facilities: Vec<Facility>,
    assignments: Vec<Assignment>,
    documents: Vec<Document>,
}

/// Credential and metadata store sharing one state, so account deletion cascades to the
/// profile and assignment rows like the relational schema does.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    pub fail_assignment_insert: AtomicBool,
    pub fail_account_delete: AtomicBool,
    pub fail_document_insert: AtomicBool,
    pub fail_document_delete: AtomicBool,
    pub fail_facility_delete: AtomicBool,
    /// Makes `has_assignment` answer false, as a check that lost a race would.
    pub stale_assignment_check: AtomicBool,
}

#[allow(dead_code)]
impl MemoryBackend {
    pub async fn identity_exists(&self, identity_id: Uuid) -> bool {
        self.state.lock().await.identities.contains_key(&identity_id)
    }

    pub async fn identity_count(&self) -> usize {
        self.state.lock().await.identities.len()
    }

    pub async fn identity_by_email(&self, email: &str) -> Option<Uuid> {
        let email = normalize_email(email);
        let state = self.state.lock().await;
        state
            .identities
            .iter()
            .find(|(_, identity)| identity.email == email)
            .map(|(id, _)| *id)
    }

    pub async fn assignment_count(&self) -> usize {
        self.state.lock().await.assignments.len()
    }

    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }

    pub async fn set_profile_active(&self, identity_id: Uuid, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(profile) = state
            .profiles
            .iter_mut()
            .find(|profile| profile.identity_id == identity_id)
        {
            profile.active = active;
        }
    }

    /// Inserts a row without the uniqueness checks, to simulate data written before the
    /// constraint existed.
    pub async fn force_insert_document(&self, document: NewDocument) {
        let now = Utc::now().naive_utc();
        self.state.lock().await.documents.push(document_row(document, now));
    }
}

fn document_row(document: NewDocument, now: chrono::NaiveDateTime) -> Document {
    Document {
        id: document.id,
        title: document.title,
        description: document.description,
        file_name: document.file_name,
        storage_key: document.storage_key,
        public_url: document.public_url,
        size_bytes: document.size_bytes,
        mime_type: document.mime_type,
        facility_id: document.facility_id,
        uploaded_by: document.uploaded_by,
        active: document.active,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl CredentialStore for MemoryBackend {
    async fn create_account(&self, account: NewAccount) -> CredentialResult<Uuid> {
        let email = normalize_email(&account.email);
        let mut state = self.state.lock().await;
        if state.identities.values().any(|identity| identity.email == email) {
            return Err(CredentialError::DuplicateEmail(email));
        }

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        state.identities.insert(
            id,
            MemoryIdentity {
                email: email.clone(),
                password: account.password,
            },
        );
        state.profiles.push(Profile {
            identity_id: id,
            email,
            full_name: account.full_name,
            role: account.role.as_str().to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn delete_account(&self, identity_id: Uuid) -> CredentialResult<()> {
        if self.fail_account_delete.load(Ordering::SeqCst) {
            return Err(CredentialError::Backend("injected delete failure".to_string()));
        }

        let mut state = self.state.lock().await;
        if state.identities.remove(&identity_id).is_none() {
            return Err(CredentialError::NotFound);
        }
        state.tokens.retain(|_, owner| *owner != identity_id);
        state.profiles.retain(|profile| profile.identity_id != identity_id);
        state
            .assignments
            .retain(|assignment| assignment.identity_id != identity_id);
        Ok(())
    }

    async fn account_by_token(&self, token: &str) -> CredentialResult<Uuid> {
        let state = self.state.lock().await;
        state
            .tokens
            .get(token)
            .copied()
            .filter(|id| state.identities.contains_key(id))
            .ok_or(CredentialError::InvalidToken)
    }

    async fn sign_in(&self, email: &str, password: &str) -> CredentialResult<Session> {
        let email = normalize_email(email);
        let mut state = self.state.lock().await;
        let identity_id = state
            .identities
            .iter()
            .find(|(_, identity)| identity.email == email && identity.password == password)
            .map(|(id, _)| *id)
            .ok_or(CredentialError::InvalidCredentials)?;

        let access_token = format!("token-{}", Uuid::new_v4());
        state.tokens.insert(access_token.clone(), identity_id);
        Ok(Session {
            identity_id,
            access_token,
            expires_in: 3600,
        })
    }
}

#[async_trait]
impl MetadataStore for MemoryBackend {
    async fn profile(&self, identity_id: Uuid) -> MetadataResult<Option<Profile>> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .iter()
            .find(|profile| profile.identity_id == identity_id)
            .cloned())
    }

    async fn list_profiles(&self, role: Role) -> MetadataResult<Vec<Profile>> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .iter()
            .rev()
            .filter(|profile| profile.role == role.as_str())
            .cloned()
            .collect())
    }

    async fn insert_facility(&self, facility: NewFacility) -> MetadataResult<Facility> {
        let now = Utc::now().naive_utc();
        let row = Facility {
            id: facility.id,
            name: facility.name,
            address: facility.address,
            phone: facility.phone,
            email: facility.email,
            responsible_person: facility.responsible_person,
            operating_hours: facility.operating_hours,
            active: facility.active,
            created_by: facility.created_by,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.facilities.push(row.clone());
        Ok(row)
    }

    async fn update_facility(
        &self,
        facility_id: Uuid,
        changes: FacilityChangeset,
    ) -> MetadataResult<Facility> {
        let mut state = self.state.lock().await;
        let facility = state
            .facilities
            .iter_mut()
            .find(|facility| facility.id == facility_id)
            .ok_or(MetadataError::NotFound("facility"))?;

        if let Some(name) = changes.name {
            facility.name = name;
        }
        if let Some(address) = changes.address {
            facility.address = address;
        }
        if let Some(phone) = changes.phone {
            facility.phone = phone;
        }
        if let Some(email) = changes.email {
            facility.email = email;
        }
        if let Some(responsible_person) = changes.responsible_person {
            facility.responsible_person = responsible_person;
        }
        if let Some(operating_hours) = changes.operating_hours {
            facility.operating_hours = operating_hours;
        }
        if let Some(active) = changes.active {
            facility.active = active;
        }
        facility.updated_at = Utc::now().naive_utc();
        Ok(facility.clone())
    }

    async fn facility(&self, facility_id: Uuid) -> MetadataResult<Option<Facility>> {
        let state = self.state.lock().await;
        Ok(state
            .facilities
            .iter()
            .find(|facility| facility.id == facility_id)
            .cloned())
    }

    async fn list_facilities(&self, active_only: bool) -> MetadataResult<Vec<Facility>> {
        let state = self.state.lock().await;
        let mut facilities: Vec<Facility> = state
            .facilities
            .iter()
            .filter(|facility| !active_only || facility.active)
            .cloned()
            .collect();
        facilities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(facilities)
    }

    async fn delete_facility(&self, facility_id: Uuid) -> MetadataResult<bool> {
        if self.fail_facility_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected delete failure".to_string()));
        }
        let mut state = self.state.lock().await;
        let referenced = state
            .assignments
            .iter()
            .any(|assignment| assignment.facility_id == facility_id)
            || state
                .documents
                .iter()
                .any(|document| document.facility_id == facility_id);
        if referenced {
            return Err(MetadataError::MissingReference(
                "facility is still referenced".to_string(),
            ));
        }
        let before = state.facilities.len();
        state.facilities.retain(|facility| facility.id != facility_id);
        Ok(state.facilities.len() != before)
    }

    async fn has_assignment(&self, facility_id: Uuid) -> MetadataResult<bool> {
        if self.stale_assignment_check.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .any(|assignment| assignment.facility_id == facility_id))
    }

    async fn insert_assignment(&self, assignment: NewAssignment) -> MetadataResult<Assignment> {
        if self.fail_assignment_insert.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected insert failure".to_string()));
        }

        let mut state = self.state.lock().await;
        if !state.identities.contains_key(&assignment.identity_id) {
            return Err(MetadataError::MissingReference("assignments_identity_id_fkey".into()));
        }
        if !state
            .facilities
            .iter()
            .any(|facility| facility.id == assignment.facility_id)
        {
            return Err(MetadataError::MissingReference("assignments_facility_id_fkey".into()));
        }
        if state
            .assignments
            .iter()
            .any(|existing| existing.facility_id == assignment.facility_id)
        {
            return Err(MetadataError::Conflict(ConflictKind::Assignment));
        }

        let row = Assignment {
            id: assignment.id,
            identity_id: assignment.identity_id,
            facility_id: assignment.facility_id,
            created_at: Utc::now().naive_utc(),
        };
        state.assignments.push(row.clone());
        Ok(row)
    }

    async fn assignment_for_identity(
        &self,
        identity_id: Uuid,
    ) -> MetadataResult<Option<Assignment>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .find(|assignment| assignment.identity_id == identity_id)
            .cloned())
    }

    async fn assignment_for_facility(
        &self,
        facility_id: Uuid,
    ) -> MetadataResult<Option<Assignment>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .find(|assignment| assignment.facility_id == facility_id)
            .cloned())
    }

    async fn list_assignments(&self) -> MetadataResult<Vec<Assignment>> {
        let state = self.state.lock().await;
        Ok(state.assignments.iter().rev().cloned().collect())
    }

    async fn delete_assignments_for_identity(&self, identity_id: Uuid) -> MetadataResult<usize> {
        let mut state = self.state.lock().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|assignment| assignment.identity_id != identity_id);
        Ok(before - state.assignments.len())
    }

    async fn delete_assignments_for_facility(&self, facility_id: Uuid) -> MetadataResult<usize> {
        let mut state = self.state.lock().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|assignment| assignment.facility_id != facility_id);
        Ok(before - state.assignments.len())
    }

    async fn has_active_document(&self, facility_id: Uuid) -> MetadataResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .any(|document| document.facility_id == facility_id && document.active))
    }

    async fn insert_document(&self, document: NewDocument) -> MetadataResult<Document> {
        if self.fail_document_insert.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected insert failure".to_string()));
        }

        let mut state = self.state.lock().await;
        if !state
            .facilities
            .iter()
            .any(|facility| facility.id == document.facility_id)
        {
            return Err(MetadataError::MissingReference("documents_facility_id_fkey".into()));
        }
        if document.active
            && state
                .documents
                .iter()
                .any(|existing| existing.facility_id == document.facility_id && existing.active)
        {
            return Err(MetadataError::Conflict(ConflictKind::ActiveDocument));
        }

        let row = document_row(document, Utc::now().naive_utc());
        state.documents.push(row.clone());
        Ok(row)
    }

    async fn document(&self, document_id: Uuid) -> MetadataResult<Option<Document>> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .find(|document| document.id == document_id)
            .cloned())
    }

    async fn active_documents(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .filter(|document| document.facility_id == facility_id && document.active)
            .cloned()
            .collect())
    }

    async fn documents_for_facility(&self, facility_id: Uuid) -> MetadataResult<Vec<Document>> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .rev()
            .filter(|document| document.facility_id == facility_id)
            .cloned()
            .collect())
    }

    async fn documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<Vec<Document>> {
        let state = self.state.lock().await;
        Ok(state
            .documents
            .iter()
            .filter(|document| document.uploaded_by == identity_id)
            .cloned()
            .collect())
    }

    async fn delete_document(&self, document_id: Uuid) -> MetadataResult<bool> {
        if self.fail_document_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected delete failure".to_string()));
        }
        let mut state = self.state.lock().await;
        let before = state.documents.len();
        state.documents.retain(|document| document.id != document_id);
        Ok(state.documents.len() != before)
    }

    async fn delete_documents_by_uploader(&self, identity_id: Uuid) -> MetadataResult<usize> {
        if self.fail_document_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected delete failure".to_string()));
        }
        let mut state = self.state.lock().await;
        let before = state.documents.len();
        state
            .documents
            .retain(|document| document.uploaded_by != identity_id);
        Ok(before - state.documents.len())
    }

    async fn delete_documents_for_facility(
        &self,
        facility_id: Uuid,
    ) -> MetadataResult<Vec<Document>> {
        if self.fail_document_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Backend("injected delete failure".to_string()));
        }
        let mut state = self.state.lock().await;
        let (removed, kept): (Vec<Document>, Vec<Document>) = state
            .documents
            .drain(..)
            .partition(|document| document.facility_id == facility_id);
        state.documents = kept;
        Ok(removed)
    }
}

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing_deletes: Mutex<HashSet<String>>,
    pub fail_deletes: AtomicBool,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(&self, upload: ObjectUpload) -> StorageResult<()> {
        let stored = StoredObject {
            key: upload.key,
            bytes: upload.bytes,
            content_type: upload.content_type,
            content_disposition: upload.content_disposition,
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let guard = self.objects.lock().await;
        guard
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| StorageError::Missing(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst)
            || self.failing_deletes.lock().await.contains(key)
        {
            return Err(StorageError::Backend {
                operation: "delete",
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let mut guard = self.objects.lock().await;
        guard.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        ubs_docs::storage::join_public_url(PUBLIC_BASE_URL, key)
    }
}

#[allow(dead_code)]
impl FakeStorage {
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }

    pub async fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().await.insert(key.to_string());
    }
}

/// The engine's three stores backed by in-memory fakes, with handles kept for assertions.
#[allow(dead_code)]
pub struct TestStores {
    pub stores: Stores,
    pub backend: Arc<MemoryBackend>,
    pub storage: Arc<FakeStorage>,
}

#[allow(dead_code)]
impl TestStores {
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::default());
        let storage = Arc::new(FakeStorage::default());
        let stores = Stores::new(backend.clone(), backend.clone(), storage.clone());
        Self {
            stores,
            backend,
            storage,
        }
    }

    pub async fn create_account(&self, email: &str, role: Role) -> Result<Caller> {
        let full_name = email.split('@').next().unwrap_or(email).to_string();
        let identity_id = self
            .backend
            .create_account(NewAccount {
                email: email.to_string(),
                password: "password123".to_string(),
                role,
                full_name: Some(full_name.clone()),
                pre_verified: true,
            })
            .await?;
        Ok(Caller {
            identity_id,
            email: normalize_email(email),
            full_name: Some(full_name),
            role,
        })
    }

    pub async fn admin(&self) -> Result<Caller> {
        self.create_account("admin@saude.example.org", Role::Admin).await
    }

    pub async fn facility(&self, name: &str) -> Result<Facility> {
        Ok(self
            .backend
            .insert_facility(NewFacility {
                id: Uuid::new_v4(),
                name: name.to_string(),
                address: format!("Rua {name}, 100"),
                phone: None,
                email: None,
                responsible_person: None,
                operating_hours: None,
                active: true,
                created_by: Uuid::new_v4(),
            })
            .await?)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
    router: Router,
    storage: Arc<FakeStorage>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Result<Self> {
        let config = test_config("postgres://unused@localhost/unused".to_string());
        let fixtures = TestStores::new();
        let state = AppState::new(config, fixtures.stores.clone());
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            backend: fixtures.backend,
            router,
            storage: fixtures.storage,
        })
    }

    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    pub async fn insert_account(&self, email: &str, password: &str, role: Role) -> Result<Uuid> {
        Ok(self
            .backend
            .create_account(NewAccount {
                email: email.to_string(),
                password: password.to_string(),
                role,
                full_name: Some("Test Account".to_string()),
                pre_verified: true,
            })
            .await?)
    }

    pub async fn login_token(&self, email: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/api/auth/login", &LoginPayload { email, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.insert_account("admin@saude.example.org", "admin-secret", Role::Admin)
            .await?;
        self.login_token("admin@saude.example.org", "admin-secret")
            .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::GET, path, token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send_empty(Method::DELETE, path, token).await
    }

    pub async fn upload_document(
        &self,
        facility_id: Uuid,
        filename: &str,
        content_type: &str,
        data: &[u8],
        title: &str,
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");

        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(b"Content-Disposition: form-data; name=\"title\"\r\n\r\n");
        body.extend(title.as_bytes());
        body.extend(b"\r\n");

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/facilities/{facility_id}/documents"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        self.send(request).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body))?).await
    }

    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    async fn send(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        database_url,
        database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        cors_allowed_origin: None,
        aws_endpoint_url: None,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        aws_region: "us-east-1".to_string(),
        s3_bucket: "ubs-documents".to_string(),
        s3_public_base_url: Some(PUBLIC_BASE_URL.to_string()),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
}

/// `TEST_DATABASE_URL`, or `None` when Postgres-backed tests should be skipped.
#[allow(dead_code)]
pub fn test_database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL").ok()
}

#[allow(dead_code)]
pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

#[allow(dead_code)]
pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    serde_json::from_slice(&bytes).context("response body is not JSON")
}
