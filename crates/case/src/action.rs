//! Who acts, what they ask for, and what they bring along.

use serde::{Deserialize, Serialize};

use shipline_core::ActorRole;
use shipline_directory::CompanyId;

use crate::documents::DocumentKind;
use crate::stage::Stage;

/// A requested transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move along the Stage Table.
    Advance,
    /// Send the case to its review stage with a reason.
    Reject { reason: String },
    /// Same route as `Reject`, phrased as a request for changes.
    RequestModification { notes: String },
    /// Observer-only forced stage change; skips role and document gates.
    AdminOverride { target: Stage, note: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Advance => "advance",
            Action::Reject { .. } => "reject",
            Action::RequestModification { .. } => "request_modification",
            Action::AdminOverride { .. } => "admin_override",
        }
    }

    pub fn decision(&self) -> Decision {
        match self {
            Action::Advance => Decision::Approve,
            Action::Reject { .. } => Decision::Reject,
            Action::RequestModification { .. } => Decision::RequestModification,
            Action::AdminOverride { .. } => Decision::Force,
        }
    }
}

/// The decision recorded on an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Approve,
    Reject,
    RequestModification,
    Force,
    /// Side-channel: slot bound.
    Assign,
    /// Side-channel: slot rebound.
    Reassign,
}

impl Decision {
    /// Does an entry with this decision move the case's stage and version?
    pub fn is_transition(&self) -> bool {
        !matches!(self, Decision::Assign | Decision::Reassign)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::RequestModification => "request-modification",
            Decision::Force => "force",
            Decision::Assign => "assign",
            Decision::Reassign => "reassign",
        }
    }
}

impl core::fmt::Display for Decision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The acting principal as the case rules see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    /// Company the principal works for, if the credentials say so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

impl Actor {
    pub fn new(role: ActorRole) -> Self {
        Self {
            role,
            company_id: None,
        }
    }

    pub fn for_company(role: ActorRole, company_id: CompanyId) -> Self {
        Self {
            role,
            company_id: Some(company_id),
        }
    }
}

/// A document handed in with a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub reference: String,
}

/// Supporting material for a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub new_documents: Vec<NewDocument>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Evidence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, kind: DocumentKind, reference: impl Into<String>) -> Self {
        self.new_documents.push(NewDocument {
            kind,
            reference: reference.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
