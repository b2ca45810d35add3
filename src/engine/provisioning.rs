//! Staff account provisioning saga.
//!
//! Creating the credential-store account and the assignment row cannot share a transaction.
//! The saga creates the account first and, if the assignment insert then fails, deletes the
//! account again so no unassigned staff account is left behind.
//!
//! ```text
//! Started -> AccountCreated -> AssignmentCreated
//!                 |
//!                 +-> Compensated        (account removed again)
//!                 +-> Failed             (account removal failed, manual cleanup)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::gate::{self, Caller};
use super::{assignments, guard, EngineError, EngineResult, Stores, ASSIGNMENT_CONFLICT};
use crate::credentials::NewAccount;
use crate::models::Role;

#[derive(Debug, Clone)]
pub struct StaffAccountRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub facility_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProvisioningState {
    Started,
    AccountCreated {
        identity_id: Uuid,
    },
    AssignmentCreated {
        identity_id: Uuid,
        assignment_id: Uuid,
    },
    /// The assignment failed and the account was removed again.
    Compensated {
        identity_id: Uuid,
        error: String,
    },
    /// Nothing usable was produced. `identity_id` is set when an account still exists and
    /// has to be removed by [`ProvisioningSaga::retry_compensation`] or by hand.
    Failed {
        identity_id: Option<Uuid>,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct ProvisioningSaga {
    id: Uuid,
    request: StaffAccountRequest,
    state: ProvisioningState,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProvisioningSaga {
    pub fn new(request: StaffAccountRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            state: ProvisioningState::Started,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ProvisioningState {
        &self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ProvisioningState::AssignmentCreated { .. }
                | ProvisioningState::Compensated { .. }
                | ProvisioningState::Failed { .. }
        )
    }

    /// Account id still held by a failed saga whose compensation did not complete.
    pub fn orphaned_identity(&self) -> Option<Uuid> {
        match self.state {
            ProvisioningState::Failed {
                identity_id: Some(identity_id),
                ..
            } => Some(identity_id),
            _ => None,
        }
    }

    fn transition(&mut self, next: ProvisioningState) {
        info!(saga_id = %self.id, from = ?self.state, to = ?next, "provisioning saga transition");
        self.state = next;
        self.updated_at = Utc::now();
    }

    /// Drives the saga from `Started`. Returns the new identity id on success.
    pub async fn run(&mut self, stores: &Stores, caller: &Caller) -> EngineResult<Uuid> {
        if self.state != ProvisioningState::Started {
            return Err(EngineError::Validation(format!(
                "provisioning saga {} has already run",
                self.id
            )));
        }

        if let Err(err) = self.preflight(stores, caller).await {
            self.transition(ProvisioningState::Failed {
                identity_id: None,
                error: err.to_string(),
            });
            return Err(err);
        }

        let facility_id = self.request.facility_id;
        let created = stores
            .credentials
            .create_account(NewAccount {
                email: self.request.email.trim().to_string(),
                password: self.request.password.clone(),
                role: Role::Staff,
                full_name: Some(self.request.full_name.trim().to_string()),
                pre_verified: true,
            })
            .await;

        let identity_id = match created {
            Ok(identity_id) => identity_id,
            Err(err) => {
                let err = EngineError::from(err);
                self.transition(ProvisioningState::Failed {
                    identity_id: None,
                    error: err.to_string(),
                });
                return Err(err);
            }
        };
        self.transition(ProvisioningState::AccountCreated { identity_id });

        let assignment_err = match assignments::assign(stores, identity_id, facility_id).await {
            Ok(assignment) => {
                self.transition(ProvisioningState::AssignmentCreated {
                    identity_id,
                    assignment_id: assignment.id,
                });
                return Ok(identity_id);
            }
            Err(err) => err,
        };

        warn!(
            saga_id = %self.id,
            identity_id = %identity_id,
            facility_id = %facility_id,
            error = %assignment_err,
            "assignment failed; removing created account"
        );

        match stores.credentials.delete_account(identity_id).await {
            Ok(()) => {
                self.transition(ProvisioningState::Compensated {
                    identity_id,
                    error: assignment_err.to_string(),
                });
                Err(assignment_err)
            }
            Err(compensation) => {
                error!(
                    saga_id = %self.id,
                    identity_id = %identity_id,
                    error = %compensation,
                    "compensation failed; account left without assignment"
                );
                self.transition(ProvisioningState::Failed {
                    identity_id: Some(identity_id),
                    error: compensation.to_string(),
                });
                Err(EngineError::CompensationFailure {
                    identity_id,
                    cause: assignment_err.to_string(),
                    compensation: compensation.to_string(),
                })
            }
        }
    }

    /// Retries the account removal of a saga that ended in `Failed` with an account.
    pub async fn retry_compensation(&mut self, stores: &Stores) -> EngineResult<()> {
        let Some(identity_id) = self.orphaned_identity() else {
            return Err(EngineError::Validation(
                "saga holds no account awaiting compensation".to_string(),
            ));
        };

        match stores.credentials.delete_account(identity_id).await {
            Ok(()) | Err(crate::credentials::CredentialError::NotFound) => {
                let error = match &self.state {
                    ProvisioningState::Failed { error, .. } => error.clone(),
                    _ => String::new(),
                };
                self.transition(ProvisioningState::Compensated { identity_id, error });
                Ok(())
            }
            Err(err) => Err(EngineError::CompensationFailure {
                identity_id,
                cause: "retried compensation".to_string(),
                compensation: err.to_string(),
            }),
        }
    }

    async fn preflight(&self, stores: &Stores, caller: &Caller) -> EngineResult<()> {
        gate::require_admin(caller)?;
        validate_request(&self.request)?;

        if guard::has_assignment(stores, self.request.facility_id).await? {
            return Err(EngineError::Conflict(ASSIGNMENT_CONFLICT.to_string()));
        }
        Ok(())
    }
}

/// Creates a staff account assigned to `facility_id`, compensating on partial failure.
pub async fn create_staff_account(
    stores: &Stores,
    caller: &Caller,
    request: StaffAccountRequest,
) -> EngineResult<Uuid> {
    let mut saga = ProvisioningSaga::new(request);
    saga.run(stores, caller).await
}

fn validate_request(request: &StaffAccountRequest) -> EngineResult<()> {
    let email = request.email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(EngineError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    if request.password.is_empty() {
        return Err(EngineError::Validation(
            "password must not be empty".to_string(),
        ));
    }
    if request.full_name.trim().is_empty() {
        return Err(EngineError::Validation(
            "full name must not be empty".to_string(),
        ));
    }
    Ok(())
}
