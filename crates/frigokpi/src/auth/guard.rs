//! Authorization guard.
//!
//! Decides whether an identity may perform an action on a resource, from its
//! role and the resource's division, region and owner. Rules are evaluated in
//! order and the first match wins:
//!
//! 1. `Admin_Directeur` may do anything.
//! 2. `administer` is denied to every other role.
//! 3. `update`/`delete` on an owned record (opportunities) is denied to anyone
//!    but its owner.
//! 4. `create`/`read`/`update`/`delete` on division/region-scoped records is
//!    allowed, subject to [`ReadScope`].
//! 5. Everything else is denied.

use serde::{Deserialize, Serialize};

use super::config::ReadScope;
use super::error::{AuthError, AuthResult};
use crate::user::{Division, Region, User, UserRole};

/// Operation requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Export,
    Administer,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Administer => "administer",
        }
    }

    /// Plain record operations.
    pub fn is_crud(&self) -> bool {
        matches!(
            self,
            Action::Create | Action::Read | Action::Update | Action::Delete
        )
    }

    /// Operations that change an existing record.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Update | Action::Delete)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "export" => Ok(Action::Export),
            "administer" => Ok(Action::Administer),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

/// Kinds of business records guarded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Account,
    Opportunity,
    QualityRecord,
    Incident,
    Dashboard,
    /// Identity records; managed through `administer`.
    Identity,
}

impl ResourceKind {
    /// Records scoped by division and region.
    pub fn is_scoped(&self) -> bool {
        !matches!(self, ResourceKind::Identity)
    }

    /// Records with a designated owner.
    pub fn is_owned(&self) -> bool {
        matches!(self, ResourceKind::Opportunity)
    }
}

/// The resource an action targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub resource: ResourceKind,
    #[serde(default)]
    pub division: Option<Division>,
    #[serde(default)]
    pub region: Option<Region>,
    /// Designated owner, for owned records.
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Scope {
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            division: None,
            region: None,
            owner_id: None,
        }
    }

    pub fn with_division(mut self, division: Division) -> Self {
        self.division = Some(division);
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }
}

/// Why a request was denied. Kept out of client responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AdminOnly,
    NotOwner,
    OutOfScope,
    NotPermitted,
}

/// Guard verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Role-based authorization. Pure: no I/O, no state besides config.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard {
    read_scope: ReadScope,
}

impl AuthorizationGuard {
    pub fn new(read_scope: ReadScope) -> Self {
        Self { read_scope }
    }

    /// Evaluate the rules for `user` doing `action` on `scope`.
    pub fn authorize(&self, user: &User, action: Action, scope: &Scope) -> Decision {
        if user.role == UserRole::AdminDirecteur {
            return Decision::Allow;
        }

        if action == Action::Administer {
            return Decision::Deny(DenyReason::AdminOnly);
        }

        if action.is_mutation()
            && scope.resource.is_owned()
            && scope
                .owner_id
                .as_deref()
                .is_some_and(|owner| owner != user.id)
        {
            return Decision::Deny(DenyReason::NotOwner);
        }

        if action.is_crud() && scope.resource.is_scoped() {
            return match self.read_scope {
                ReadScope::Open => Decision::Allow,
                ReadScope::DivisionRegion if within_scope(user, scope) => Decision::Allow,
                ReadScope::DivisionRegion => Decision::Deny(DenyReason::OutOfScope),
            };
        }

        Decision::Deny(DenyReason::NotPermitted)
    }

    /// Like [`authorize`](Self::authorize), as a `Forbidden` error naming the action.
    pub fn require(&self, user: &User, action: Action, scope: &Scope) -> AuthResult<()> {
        match self.authorize(user, action, scope) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::debug!(
                    user_id = %user.id,
                    role = %user.role,
                    action = %action,
                    resource = ?scope.resource,
                    ?reason,
                    "Authorization denied"
                );
                Err(AuthError::Forbidden(action))
            }
        }
    }

    /// Shortcut for identity administration.
    pub fn require_admin(&self, user: &User) -> AuthResult<()> {
        self.require(user, Action::Administer, &Scope::new(ResourceKind::Identity))
    }

    /// Visibility filter for listing records of a kind.
    pub fn record_filter(&self, user: &User, resource: ResourceKind) -> RecordFilter {
        RecordFilter::for_identity(user, resource, self.read_scope)
    }
}

/// An identity restricted on an attribute only when it carries one.
fn within_scope(user: &User, scope: &Scope) -> bool {
    if user.role == UserRole::AssistanteDirection {
        return true;
    }
    let division_ok = match (user.division, scope.division) {
        (Some(mine), Some(theirs)) => mine == theirs,
        _ => true,
    };
    let region_ok = match (user.region, scope.region) {
        (Some(mine), Some(theirs)) => mine == theirs,
        _ => true,
    };
    division_ok && region_ok
}

/// Constraints a list query must apply for an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub division: Option<Division>,
    pub region: Option<Region>,
    pub owner_id: Option<String>,
}

impl RecordFilter {
    /// Build the filter for `user` listing `resource`.
    ///
    /// In every mode business developers list only the opportunities they
    /// own. Under `open`, accounts are confined to the caller's region
    /// (Admin_Directeur and Assistante_Direction excepted). Under
    /// `division_region` every scoped kind is confined to both the
    /// caller's division and region.
    pub fn for_identity(user: &User, resource: ResourceKind, read_scope: ReadScope) -> Self {
        if user.role == UserRole::AdminDirecteur {
            return Self::default();
        }

        let mut filter = Self::default();
        if resource.is_owned() && user.role.is_business_developer() {
            filter.owner_id = Some(user.id.clone());
        }
        if user.role == UserRole::AssistanteDirection {
            return filter;
        }
        match read_scope {
            ReadScope::Open if resource == ResourceKind::Account => {
                filter.region = user.region;
            }
            ReadScope::Open => {}
            ReadScope::DivisionRegion if resource.is_scoped() => {
                filter.division = user.division;
                filter.region = user.region;
            }
            ReadScope::DivisionRegion => {}
        }
        filter
    }

    pub fn is_unrestricted(&self) -> bool {
        self.division.is_none() && self.region.is_none() && self.owner_id.is_none()
    }
}
