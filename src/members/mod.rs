pub mod bulk;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use bulk::{BulkReport, BulkStatus};

/// Account role within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Unknown strings fall back to `Member`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "owner" => Role::Owner,
            _ => Role::Member,
        }
    }
}

/// Tag carried on allocation rows. Must match the referenced person's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Active,
    PreRegistered,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Active => "active",
            ResourceType::PreRegistered => "pre_registered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ResourceType::Active),
            "pre_registered" => Some(ResourceType::PreRegistered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationType {
    EmailInvite,
    PreRegistered,
}

impl InvitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationType::EmailInvite => "email_invite",
            InvitationType::PreRegistered => "pre_registered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email_invite" => Some(InvitationType::EmailInvite),
            "pre_registered" => Some(InvitationType::PreRegistered),
            _ => None,
        }
    }
}

/// A registered person eligible for project allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMember {
    pub id: String,
    pub company_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Per-member override of the company work week.
    pub weekly_capacity: Option<f64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
}

/// An invited or pre-registered person with no account yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingMember {
    pub id: String,
    pub company_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub weekly_capacity: Option<f64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub invitation_type: InvitationType,
}

/// Either variant of a staffable person. All aggregation runs over this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Active(TeamMember),
    Pending(PendingMember),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Resource::Active(m) => &m.id,
            Resource::Pending(p) => &p.id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Resource::Pending(_))
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Active(_) => ResourceType::Active,
            Resource::Pending(_) => ResourceType::PreRegistered,
        }
    }

    pub fn first_name(&self) -> &str {
        match self {
            Resource::Active(m) => &m.first_name,
            Resource::Pending(p) => &p.first_name,
        }
    }

    pub fn last_name(&self) -> &str {
        match self {
            Resource::Active(m) => &m.last_name,
            Resource::Pending(p) => &p.last_name,
        }
    }

    /// "First Last", falling back to the email or id when both names are blank.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name(), self.last_name())
            .trim()
            .to_string();
        if !name.is_empty() {
            return name;
        }
        self.email().unwrap_or(self.id()).to_string()
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Resource::Active(m) => m.email.as_deref(),
            Resource::Pending(p) => p.email.as_deref(),
        }
    }

    pub fn weekly_capacity(&self) -> Option<f64> {
        match self {
            Resource::Active(m) => m.weekly_capacity,
            Resource::Pending(p) => p.weekly_capacity,
        }
    }

    pub fn department(&self) -> Option<&str> {
        match self {
            Resource::Active(m) => m.department.as_deref(),
            Resource::Pending(p) => p.department.as_deref(),
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Resource::Active(m) => m.location.as_deref(),
            Resource::Pending(p) => p.location.as_deref(),
        }
    }
}

/// Input for adding a member, inviting one, or a roster import row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMember {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub weekly_capacity: Option<f64>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl NewMember {
    pub fn into_member(self, id: String, company_id: &str) -> TeamMember {
        TeamMember {
            id,
            company_id: company_id.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.map(|e| e.trim().to_lowercase()),
            weekly_capacity: self.weekly_capacity,
            department: self.department,
            location: self.location,
            job_title: self.job_title,
            role: self.role,
            avatar_url: None,
        }
    }

    pub fn into_pending(
        self,
        id: String,
        company_id: &str,
        invitation_type: InvitationType,
    ) -> PendingMember {
        PendingMember {
            id,
            company_id: company_id.to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.map(|e| e.trim().to_lowercase()),
            weekly_capacity: self.weekly_capacity,
            department: self.department,
            location: self.location,
            job_title: self.job_title,
            invitation_type,
        }
    }
}

/// Partial update applied by edit forms and bulk updates. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub weekly_capacity: Option<f64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    pub role: Option<Role>,
    pub avatar_url: Option<String>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.weekly_capacity.is_none()
            && self.department.is_none()
            && self.location.is_none()
            && self.job_title.is_none()
            && self.role.is_none()
            && self.avatar_url.is_none()
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
