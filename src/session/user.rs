use serde::{Deserialize, Serialize};

/// Storefront role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    /// Unknown role strings fall back to `Customer`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "seller" => Role::Seller,
            _ => Role::Customer,
        }
    }
}

/// Identity record owned by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: role.as_str().to_string(),
            created_at: created_at.into(),
            full_name: None,
            phone: None,
            avatar_url: None,
            address: None,
        }
    }

    pub fn role(&self) -> Role {
        Role::from_str(&self.role)
    }

    /// Shallow merge: every field set in `patch` replaces the current value.
    pub fn apply(&mut self, patch: UserPatch) {
        let UserPatch {
            email,
            role,
            full_name,
            phone,
            avatar_url,
            address,
        } = patch;

        if let Some(email) = email {
            self.email = email;
        }
        if let Some(role) = role {
            self.role = role;
        }
        if full_name.is_some() {
            self.full_name = full_name;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if avatar_url.is_some() {
            self.avatar_url = avatar_url;
        }
        if address.is_some() {
            self.address = address;
        }
    }
}

/// Partial profile update. `id` and `created_at` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub address: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
