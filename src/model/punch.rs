use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// One of the four attendance events. The Spanish labels printed on the
/// kiosk buttons are accepted as aliases.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PunchType {
    #[serde(alias = "Entrada")]
    #[strum(to_string = "check_in", serialize = "Entrada")]
    CheckIn,
    #[serde(alias = "Salida Descanso")]
    #[strum(to_string = "break_out", serialize = "Salida Descanso")]
    BreakOut,
    #[serde(alias = "Vuelta Descanso")]
    #[strum(to_string = "break_in", serialize = "Vuelta Descanso")]
    BreakIn,
    #[serde(alias = "Salida")]
    #[strum(to_string = "check_out", serialize = "Salida")]
    CheckOut,
}

impl TryFrom<String> for PunchType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "employee_id": 7,
    "punch_type": "check_in",
    "punched_at": "2026-03-02T09:01:12"
}))]
pub struct Punch {
    pub id: u64,
    pub employee_id: u64,
    #[sqlx(try_from = "String")]
    pub punch_type: PunchType,
    #[schema(value_type = String, format = "date-time")]
    pub punched_at: NaiveDateTime,
}

/// Punch joined with the owning employee's display name, used by logs,
/// stats and the CSV export.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PunchLog {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "Ana Ruiz")]
    pub employee: String,
    #[sqlx(try_from = "String")]
    pub punch_type: PunchType,
    #[schema(value_type = String, format = "date-time")]
    pub punched_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels() {
        assert_eq!(PunchType::CheckIn.to_string(), "check_in");
        assert_eq!(PunchType::BreakOut.as_ref(), "break_out");
        assert_eq!("break_in".parse::<PunchType>().unwrap(), PunchType::BreakIn);
        assert_eq!("check_out".parse::<PunchType>().unwrap(), PunchType::CheckOut);
    }

    #[test]
    fn test_spanish_aliases() {
        assert_eq!("Entrada".parse::<PunchType>().unwrap(), PunchType::CheckIn);
        assert_eq!("Salida Descanso".parse::<PunchType>().unwrap(), PunchType::BreakOut);
        assert_eq!("Vuelta Descanso".parse::<PunchType>().unwrap(), PunchType::BreakIn);
        assert_eq!("Salida".parse::<PunchType>().unwrap(), PunchType::CheckOut);

        let parsed: PunchType = serde_json::from_str("\"Salida Descanso\"").unwrap();
        assert_eq!(parsed, PunchType::BreakOut);
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert!("lunch".parse::<PunchType>().is_err());
        assert!("".parse::<PunchType>().is_err());
    }

    #[test]
    fn test_serializes_canonical_label() {
        let json = serde_json::to_string(&PunchType::CheckOut).unwrap();
        assert_eq!(json, "\"check_out\"");
    }
}
