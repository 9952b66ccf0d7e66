mod event;
mod identity;
mod role_id;

pub use event::*;
pub use identity::*;
pub use role_id::*;
