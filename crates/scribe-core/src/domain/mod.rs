//! Domain entities - the core business objects.

mod actor;
mod post;
mod user;

pub use actor::Actor;
pub use post::{Post, PostPatch};
pub use user::{DEFAULT_ROLE, User};
