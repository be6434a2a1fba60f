//! Backend wire types

use serde::{Deserialize, Serialize};

/// `POST /token/` response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// `POST /token/refresh/` response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessResponse {
    pub access: String,
}

/// `GET /users/me/` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One textbook listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Textbook {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub school_class: String,
    pub publisher: String,
    /// Price as the backend stores it, a decimal string
    pub price: String,
    pub condition: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub whatsapp_contact: Option<String>,
    #[serde(default)]
    pub viber_contact: Option<String>,
    #[serde(default)]
    pub telegram_contact: Option<String>,
    #[serde(default)]
    pub phone_contact: Option<String>,
}

/// Offset-paginated search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextbookPage {
    /// Total matching listings, across all pages
    pub count: u64,
    pub results: Vec<Textbook>,
}
