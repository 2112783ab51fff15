use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use shipline_core::ActorRole;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "case.read"). They gate
/// *endpoints*; which stage a role may move a case into is decided by the
/// case rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const CASE_CREATE: Permission = Permission(Cow::Borrowed("case.create"));
    pub const CASE_READ: Permission = Permission(Cow::Borrowed("case.read"));
    pub const CASE_TRANSITION: Permission = Permission(Cow::Borrowed("case.transition"));
    pub const CASE_ASSIGN: Permission = Permission(Cow::Borrowed("case.assign"));
    pub const CASE_OVERRIDE: Permission = Permission(Cow::Borrowed("case.override"));
    pub const DOCUMENTS_RECORD: Permission = Permission(Cow::Borrowed("case.documents.record"));
    pub const AUDIT_READ: Permission = Permission(Cow::Borrowed("case.audit.read"));
    pub const DIRECTORY_READ: Permission = Permission(Cow::Borrowed("directory.read"));
    pub const DIRECTORY_WRITE: Permission = Permission(Cow::Borrowed("directory.write"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission policy.
pub fn permissions_for(role: ActorRole) -> Vec<Permission> {
    let mut perms = vec![
        Permission::CASE_READ,
        Permission::AUDIT_READ,
        Permission::DIRECTORY_READ,
    ];

    match role {
        ActorRole::Exporter => perms.extend([
            Permission::CASE_CREATE,
            Permission::CASE_TRANSITION,
            Permission::CASE_ASSIGN,
            Permission::DOCUMENTS_RECORD,
        ]),
        ActorRole::Customs | ActorRole::Shoring | ActorRole::Shipping | ActorRole::Buyer => {
            perms.extend([Permission::CASE_TRANSITION, Permission::DOCUMENTS_RECORD])
        }
        ActorRole::Observer => perms.extend([
            Permission::CASE_ASSIGN,
            Permission::CASE_OVERRIDE,
            Permission::DIRECTORY_WRITE,
        ]),
    }

    perms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everyone_can_read_cases_and_audit() {
        for role in ActorRole::ALL {
            let perms = permissions_for(role);
            assert!(perms.contains(&Permission::CASE_READ), "{role}");
            assert!(perms.contains(&Permission::AUDIT_READ), "{role}");
        }
    }

    #[test]
    fn override_is_observer_only() {
        for role in ActorRole::ALL {
            let has = permissions_for(role).contains(&Permission::CASE_OVERRIDE);
            assert_eq!(has, role == ActorRole::Observer, "{role}");
        }
    }

    #[test]
    fn observer_cannot_transition_or_record() {
        let perms = permissions_for(ActorRole::Observer);
        assert!(!perms.contains(&Permission::CASE_TRANSITION));
        assert!(!perms.contains(&Permission::DOCUMENTS_RECORD));
    }
}
