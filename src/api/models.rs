use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of platform roles. Wire names are the backend's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "TRAVAILLEUR")]
    Worker,
    #[serde(rename = "PORTEURDEPROJET")]
    ProjectOwner,
    #[serde(rename = "FOURNISSEUR")]
    Supplier,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Worker, Role::ProjectOwner, Role::Supplier];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Worker => "TRAVAILLEUR",
            Role::ProjectOwner => "PORTEURDEPROJET",
            Role::Supplier => "FOURNISSEUR",
        }
    }

    /// Accepts wire names as well as the English aliases, case-insensitively.
    pub fn parse(input: &str) -> Option<Role> {
        let upper = input.trim().to_ascii_uppercase();
        match upper.as_str() {
            "ADMIN" => Some(Role::Admin),
            "TRAVAILLEUR" | "WORKER" => Some(Role::Worker),
            "PORTEURDEPROJET" | "PROJECT_OWNER" | "PROJECTOWNER" | "OWNER" => Some(Role::ProjectOwner),
            "FOURNISSEUR" | "SUPPLIER" => Some(Role::Supplier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    #[serde(default, deserialize_with = "wire::opaque_id")]
    pub id: String,
    pub name: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "wire::opaque_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competences: Option<Vec<String>>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r.name == role)
    }

    /// The first listed role decides which dashboard the user lands on.
    pub fn primary_role(&self) -> Option<Role> {
        self.roles.first().map(|r| r.name)
    }
}

/// One directed text message. Immutable once the server has recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "wire::opaque_id")]
    pub id: String,
    pub sender: User,
    pub receiver: User,
    /// Empty content is valid: it marks the start of a conversation.
    #[serde(default, deserialize_with = "wire::nullable_string")]
    pub content: String,
    #[serde(with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender.id == user_id
    }

    /// The participant that is not `me`.
    pub fn counterpart(&self, me: &str) -> &User {
        if self.sender.id == me {
            &self.receiver
        } else {
            &self.sender
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_name: Role,
}

/// Body of `GET /auth/validate`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub user: User,
}

mod wire {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    /// Ids are opaque; the backend may send them as numbers or strings.
    pub fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        })
    }

    pub fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub mod timestamp {
        use super::*;

        pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&ts.to_rfc3339())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            parse(&raw).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {raw:?}")))
        }

        /// RFC 3339, or a zone-less local date-time which is taken as UTC.
        pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Some(ts.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
    }
}
