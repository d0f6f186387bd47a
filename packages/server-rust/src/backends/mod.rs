//! Demo resources served by the gateway binary.

pub mod echo;
pub mod users;

pub use echo::Echo;
pub use users::{UserRecord, Users};

use switchboard_core::{RegistrationError, Registry};

/// Registers every demo resource under its default name.
///
/// # Errors
///
/// Returns the first [`RegistrationError`] encountered.
pub fn register_all(registry: &Registry) -> Result<(), RegistrationError> {
    registry.register_resource(Users::default())?;
    registry.register_resource(Echo)?;
    Ok(())
}
