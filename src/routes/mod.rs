/// Router Module Index
///
/// Routes are split by the access tier the route table assigns to their prefixes.

/// Routes reachable without a session.
pub mod public;

/// Routes requiring any signed-in user.
pub mod authenticated;

/// Routes restricted to the admin tier, nested under `/api/admin`.
pub mod admin;
