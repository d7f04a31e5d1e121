//! Role → capability mapping.
//!
//! Capabilities are derived on every check and never persisted. Resolution
//! is independent of authentication state: a `None` user simply has none.

use crate::session::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Enter the `/admin` area.
    AdminPanel,
    /// Create and edit product listings.
    ManageCatalog,
    /// Change order state for any buyer.
    ManageOrders,
    /// Change other users' roles.
    ManageUsers,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::AdminPanel,
        Capability::ManageCatalog,
        Capability::ManageOrders,
        Capability::ManageUsers,
    ];

    fn bit(self) -> u8 {
        match self {
            Capability::AdminPanel => 1 << 0,
            Capability::ManageCatalog => 1 << 1,
            Capability::ManageOrders => 1 << 2,
            Capability::ManageUsers => 1 << 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::AdminPanel => "admin_panel",
            Capability::ManageCatalog => "manage_catalog",
            Capability::ManageOrders => "manage_orders",
            Capability::ManageUsers => "manage_users",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0 |= capability.bit();
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

/// Capabilities granted to `user`.
pub fn resolve(user: Option<&User>) -> CapabilitySet {
    let Some(user) = user else {
        return CapabilitySet::empty();
    };
    match user.role() {
        Role::Admin => Capability::ALL
            .into_iter()
            .fold(CapabilitySet::empty(), CapabilitySet::with),
        Role::Seller => CapabilitySet::empty().with(Capability::ManageCatalog),
        Role::Customer => CapabilitySet::empty(),
    }
}
