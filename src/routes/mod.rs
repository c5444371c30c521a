/// Router Module Index
///
/// Organizes routing into access-segregated modules. Access control is
/// applied per module (via axum layers) so a protected endpoint cannot be
/// mounted without its guard.

/// Routes accessible without a session: health, registration, login.
pub mod public;

/// Routes restricted to administrators. Mounted under `/admin` behind the
/// admin guard layer.
pub mod admin;
