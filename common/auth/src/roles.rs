pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Roles permitted to record a sale.
pub const SALE_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_STAFF];
