//! Parsers for the quoted arguments of the scenario steps.
//!
//! Each step argument is parsed into an enum so that a typo in a feature
//! file fails the step instead of silently matching nothing.

use std::fmt;
use std::str::FromStr;

/// Whether a resource is expected to be there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Exists,
    DoesNotExist,
}

impl Existence {
    /// Compare the expectation against what was observed.
    pub fn check(&self, present: bool, what: &str) -> Result<(), String> {
        match (self, present) {
            (Existence::Exists, true) | (Existence::DoesNotExist, false) => Ok(()),
            (Existence::Exists, false) => Err(format!("{} should exist but was not found", what)),
            (Existence::DoesNotExist, true) => {
                Err(format!("{} should not exist but was found", what))
            }
        }
    }
}

impl FromStr for Existence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exists" => Ok(Existence::Exists),
            "does not exist" => Ok(Existence::DoesNotExist),
            other => Err(format!("unknown existence state '{}'", other)),
        }
    }
}

/// Status code a scenario expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    Exactly(u16),
    /// Unprivileged users get a 400 from some handlers instead of a 401.
    BadRequestOrUnauthorized,
}

/// Codes the scenarios are allowed to name.
const KNOWN_STATUSES: [u16; 6] = [200, 201, 202, 400, 401, 409];

impl ExpectedStatus {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            ExpectedStatus::Exactly(expected) => *expected == status,
            ExpectedStatus::BadRequestOrUnauthorized => status == 400 || status == 401,
        }
    }
}

impl FromStr for ExpectedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "400 or 401" {
            return Ok(ExpectedStatus::BadRequestOrUnauthorized);
        }

        match s.parse::<u16>() {
            Ok(code) if KNOWN_STATUSES.contains(&code) => Ok(ExpectedStatus::Exactly(code)),
            _ => Err(format!("unexpected status expectation '{}'", s)),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::Exactly(code) => write!(f, "{}", code),
            ExpectedStatus::BadRequestOrUnauthorized => write!(f, "400 or 401"),
        }
    }
}

/// The request a "when" step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Update,
    Move,
    Post,
    Delete,
    MalformedPost,
    CreateNode,
    UpdateNodes,
    DeleteNode,
    AddAlarm,
    DeleteAlarm,
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "get" => RequestKind::Get,
            "update" => RequestKind::Update,
            "move" => RequestKind::Move,
            "post" => RequestKind::Post,
            "delete" => RequestKind::Delete,
            "malformed post" => RequestKind::MalformedPost,
            "create node" => RequestKind::CreateNode,
            "update nodes" => RequestKind::UpdateNodes,
            "delete node" => RequestKind::DeleteNode,
            "add alarm" => RequestKind::AddAlarm,
            "delete alarm" => RequestKind::DeleteAlarm,
            other => return Err(format!("unknown request kind '{}'", other)),
        })
    }
}

/// State the alias should be in after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOutcome {
    Created,
    NotCreated,
    Deleted,
    Updated,
    HasNode,
    HasUpdatedNodes,
    HasNoNode,
    HasAlarm,
    HasNoAlarm,
}

impl ObjectOutcome {
    /// Outcomes judged on the last response status alone.
    ///
    /// `None` means the alias has to be fetched again.
    pub fn expected_status(&self) -> Option<u16> {
        match self {
            ObjectOutcome::Created => Some(201),
            ObjectOutcome::NotCreated => Some(400),
            ObjectOutcome::Deleted => Some(200),
            _ => None,
        }
    }
}

impl FromStr for ObjectOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "be created" => ObjectOutcome::Created,
            "not be created" => ObjectOutcome::NotCreated,
            "be deleted" => ObjectOutcome::Deleted,
            "be updated" => ObjectOutcome::Updated,
            "have node" => ObjectOutcome::HasNode,
            "have updated nodes" => ObjectOutcome::HasUpdatedNodes,
            "not have node" => ObjectOutcome::HasNoNode,
            "have alarm" => ObjectOutcome::HasAlarm,
            "not have alarm" => ObjectOutcome::HasNoAlarm,
            other => return Err(format!("unknown object outcome '{}'", other)),
        })
    }
}
