/// Router Module Index
///
/// Routing is split by access level so that authentication is attached once per router
/// layer instead of per handler.

/// Routes open to anonymous callers.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes restricted to the `admin` role.
pub mod admin;
