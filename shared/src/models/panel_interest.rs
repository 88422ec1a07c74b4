//! Panel Interest Model

use serde::{Deserialize, Serialize};

/// Expression of interest in speaking on / joining a panel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PanelInterest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub topic: Option<String>,
    pub message: Option<String>,
    pub created_at: i64,
}
