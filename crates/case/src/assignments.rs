//! Assignment Resolver rules.
//!
//! One company per slot per case; a bound slot changes only through an explicit
//! reassignment. How a company gets chosen is the caller's business.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shipline_core::{DomainError, DomainResult};
use shipline_directory::{Company, CompanyId, ServiceKind};

/// Slot → bound company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignments {
    slots: BTreeMap<ServiceKind, CompanyId>,
}

impl Assignments {
    pub fn get(&self, slot: ServiceKind) -> Option<CompanyId> {
        self.slots.get(&slot).copied()
    }

    /// Is `company` bound to any slot?
    pub fn involves(&self, company: CompanyId) -> bool {
        self.slots.values().any(|c| *c == company)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServiceKind, CompanyId)> + '_ {
        self.slots.iter().map(|(s, c)| (*s, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn bind(&mut self, slot: ServiceKind, company: CompanyId) -> Option<CompanyId> {
        self.slots.insert(slot, company)
    }
}

/// The directory facts an assignment is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: CompanyId,
    pub service: ServiceKind,
}

impl From<&Company> for CompanyRef {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            service: company.service,
        }
    }
}

/// What an assign/reassign did to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentChange {
    pub slot: ServiceKind,
    pub company_id: CompanyId,
    pub previous: Option<CompanyId>,
}

fn ensure_service_matches(slot: ServiceKind, company: &CompanyRef) -> DomainResult<()> {
    if company.service != slot {
        return Err(DomainError::validation(format!(
            "company {} provides {} services and cannot fill the {} slot",
            company.id, company.service, slot
        )));
    }
    Ok(())
}

/// Bind an empty slot.
pub fn check_assign(
    assignments: &Assignments,
    slot: ServiceKind,
    company: &CompanyRef,
) -> DomainResult<AssignmentChange> {
    ensure_service_matches(slot, company)?;

    if let Some(current) = assignments.get(slot) {
        return Err(DomainError::already_assigned(format!(
            "{slot} slot is bound to company {current}; use reassign"
        )));
    }

    Ok(AssignmentChange {
        slot,
        company_id: company.id,
        previous: None,
    })
}

/// Rebind an occupied slot to a different company.
pub fn check_reassign(
    assignments: &Assignments,
    slot: ServiceKind,
    company: &CompanyRef,
    reason: &str,
) -> DomainResult<AssignmentChange> {
    if reason.trim().is_empty() {
        return Err(DomainError::validation("reassignment requires a reason"));
    }
    ensure_service_matches(slot, company)?;

    let current = assignments
        .get(slot)
        .ok_or_else(|| DomainError::SlotUnassigned(slot.to_string()))?;

    if current == company.id {
        return Err(DomainError::already_assigned(format!(
            "{slot} slot is already bound to company {current}"
        )));
    }

    Ok(AssignmentChange {
        slot,
        company_id: company.id,
        previous: Some(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipline_core::AggregateId;

    fn company(service: ServiceKind) -> CompanyRef {
        CompanyRef {
            id: CompanyId::new(AggregateId::new()),
            service,
        }
    }

    #[test]
    fn assign_binds_empty_slot() {
        let broker = company(ServiceKind::Customs);
        let change = check_assign(&Assignments::default(), ServiceKind::Customs, &broker).unwrap();
        assert_eq!(change.company_id, broker.id);
        assert_eq!(change.previous, None);
    }

    #[test]
    fn assign_refuses_bound_slot() {
        let mut assignments = Assignments::default();
        assignments.bind(ServiceKind::Customs, company(ServiceKind::Customs).id);

        let err = check_assign(&assignments, ServiceKind::Customs, &company(ServiceKind::Customs))
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyAssigned(_)));
    }

    #[test]
    fn assign_refuses_wrong_service() {
        let err = check_assign(
            &Assignments::default(),
            ServiceKind::Shipping,
            &company(ServiceKind::Shoring),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reassign_needs_reason_and_bound_slot() {
        let agent = company(ServiceKind::Shipping);

        let err = check_reassign(&Assignments::default(), ServiceKind::Shipping, &agent, "  ")
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = check_reassign(&Assignments::default(), ServiceKind::Shipping, &agent, "late")
            .unwrap_err();
        assert_eq!(err, DomainError::SlotUnassigned("shipping".to_string()));
    }

    #[test]
    fn reassign_to_same_company_is_already_assigned() {
        let agent = company(ServiceKind::Shipping);
        let mut assignments = Assignments::default();
        assignments.bind(ServiceKind::Shipping, agent.id);

        let err = check_reassign(&assignments, ServiceKind::Shipping, &agent, "again").unwrap_err();
        assert!(matches!(err, DomainError::AlreadyAssigned(_)));

        let other = company(ServiceKind::Shipping);
        let change = check_reassign(&assignments, ServiceKind::Shipping, &other, "capacity").unwrap();
        assert_eq!(change.previous, Some(agent.id));
        assert_eq!(change.company_id, other.id);
    }
}
