//! Identity data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::sqlite_text_enum;

/// Job function of an identity. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "Admin_Directeur")]
    AdminDirecteur,
    #[serde(rename = "Assistante_Direction")]
    AssistanteDirection,
    #[serde(rename = "Directrice_Clientele")]
    DirectriceClientele,
    #[serde(rename = "Assistante_Clientele")]
    AssistanteClientele,
    #[serde(rename = "DevCo_IDF")]
    DevCoIdf,
    #[serde(rename = "DevCo_HDF")]
    DevCoHdf,
}

impl UserRole {
    pub const ALL: [UserRole; 6] = [
        UserRole::AdminDirecteur,
        UserRole::AssistanteDirection,
        UserRole::DirectriceClientele,
        UserRole::AssistanteClientele,
        UserRole::DevCoIdf,
        UserRole::DevCoHdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::AdminDirecteur => "Admin_Directeur",
            UserRole::AssistanteDirection => "Assistante_Direction",
            UserRole::DirectriceClientele => "Directrice_Clientele",
            UserRole::AssistanteClientele => "Assistante_Clientele",
            UserRole::DevCoIdf => "DevCo_IDF",
            UserRole::DevCoHdf => "DevCo_HDF",
        }
    }

    /// Business developers only see the opportunities they own.
    pub fn is_business_developer(&self) -> bool {
        matches!(self, UserRole::DevCoIdf | UserRole::DevCoHdf)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

sqlite_text_enum!(UserRole);

/// Business division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "ALS FRESH FOOD")]
    FreshFood,
    #[serde(rename = "ALS PHARMA")]
    Pharma,
}

impl Division {
    pub fn as_str(&self) -> &'static str {
        match self {
            Division::FreshFood => "ALS FRESH FOOD",
            Division::Pharma => "ALS PHARMA",
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Division {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ALS FRESH FOOD" | "FRESH FOOD" => Ok(Division::FreshFood),
            "ALS PHARMA" | "PHARMA" => Ok(Division::Pharma),
            _ => Err(format!("unknown division: {}", s)),
        }
    }
}

sqlite_text_enum!(Division);

/// Operating region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "IDF")]
    Idf,
    #[serde(rename = "HDF")]
    Hdf,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Idf => "IDF",
            Region::Hdf => "HDF",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IDF" => Ok(Region::Idf),
            "HDF" => Ok(Region::Hdf),
            _ => Err(format!("unknown region: {}", s)),
        }
    }
}

sqlite_text_enum!(Region);

/// Identity record from the directory.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub picture: Option<String>,
    pub role: UserRole,
    pub division: Option<Division>,
    pub region: Option<Region>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Public identity info (safe to return to clients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: UserRole,
    pub division: Option<Division>,
    pub region: Option<Region>,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.display_name,
            picture: user.picture,
            role: user.role,
            division: user.division,
            region: user.region,
            created_at: user.created_at,
        }
    }
}

/// A fully validated identity ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub picture: Option<String>,
    pub role: UserRole,
    pub division: Option<Division>,
    pub region: Option<Region>,
}

/// Field changes applied by an administrative update.
///
/// `division` and `region` use a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct IdentityChanges {
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub division: Option<Option<Division>>,
    pub region: Option<Option<Region>>,
}

impl IdentityChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.division.is_none()
            && self.region.is_none()
    }
}

/// Request to create a new identity (cleartext password, not yet hashed).
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub role: UserRole,
    pub division: Option<Division>,
    pub region: Option<Region>,
}

/// Request to update an existing identity (cleartext password, not yet hashed).
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub division: Option<Option<Division>>,
    pub region: Option<Option<Region>>,
}

/// Identity list query parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    pub division: Option<Division>,
    pub region: Option<Region>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::AdminDirecteur.to_string(), "Admin_Directeur");
        assert_eq!(UserRole::DevCoHdf.to_string(), "DevCo_HDF");
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!(
            "Directrice_Clientele".parse::<UserRole>().unwrap(),
            UserRole::DirectriceClientele
        );
        assert_eq!("devco_idf".parse::<UserRole>().unwrap(), UserRole::DevCoIdf);
        assert!("admin".parse::<UserRole>().is_err());
        assert!("".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_user_role_serde_uses_canonical_names() {
        let json = serde_json::to_string(&UserRole::AssistanteClientele).unwrap();
        assert_eq!(json, "\"Assistante_Clientele\"");
        let parsed: UserRole = serde_json::from_str("\"DevCo_HDF\"").unwrap();
        assert_eq!(parsed, UserRole::DevCoHdf);
    }

    #[test]
    fn test_division_and_region_parse() {
        assert_eq!("ALS PHARMA".parse::<Division>().unwrap(), Division::Pharma);
        assert_eq!(
            "als fresh food".parse::<Division>().unwrap(),
            Division::FreshFood
        );
        assert!("ALS FROZEN".parse::<Division>().is_err());
        assert_eq!("hdf".parse::<Region>().unwrap(), Region::Hdf);
        assert!("PACA".parse::<Region>().is_err());
    }

    #[test]
    fn test_user_info_from_user_hides_password() {
        let user = User {
            id: "usr_test".to_string(),
            email: "alice@x.com".to_string(),
            display_name: "Alice".to_string(),
            password_hash: Some("secret".to_string()),
            picture: None,
            role: UserRole::DevCoIdf,
            division: Some(Division::Pharma),
            region: Some(Region::Idf),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        };

        let serialized = serde_json::to_value(&user).unwrap();
        assert!(serialized.get("password_hash").is_none());

        let info: UserInfo = user.into();
        assert_eq!(info.name, "Alice");
        assert_eq!(info.division, Some(Division::Pharma));
    }
}
