// Identity provider boundary: token issuing/validation and the
// request-scoped viewer context.

pub mod identity;
pub mod viewer;

pub use identity::IdentityService;
pub use viewer::{viewer_middleware, Viewer, ViewerContext};
