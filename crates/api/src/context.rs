use shipline_auth::{Principal, PrincipalId};
use shipline_case::Actor;
use shipline_core::ActorRole;
use shipline_directory::CompanyId;

/// Principal context for a request (authenticated identity, role, company).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.principal_id
    }

    pub fn role(&self) -> ActorRole {
        self.principal.role
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.principal.company_id.map(CompanyId::new)
    }

    /// The acting party as the case rules see it.
    pub fn actor(&self) -> Actor {
        match self.company_id() {
            Some(company_id) => Actor::for_company(self.role(), company_id),
            None => Actor::new(self.role()),
        }
    }
}
