use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub id: u32,
    pub name: String,
    pub extension: String,
    pub compiled: bool,
    pub scaffold: String,
}
