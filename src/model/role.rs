use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    /// Unknown roles fall back to `Employee`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(Role::Employee)
    }
}

impl TryFrom<String> for Role {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_strings() {
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
    }

    #[test]
    fn test_unknown_role_falls_back_to_employee() {
        assert_eq!(Role::parse_or_default(Some("superuser")), Role::Employee);
        assert_eq!(Role::parse_or_default(None), Role::Employee);
        assert_eq!(Role::parse_or_default(Some(" admin ")), Role::Admin);
    }
}
