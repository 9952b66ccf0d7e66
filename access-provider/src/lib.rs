mod access_provider;
mod error;
mod models;

pub use access_provider::*;
pub use error::AccessError;
pub use models::*;

pub trait SerializableRegistry<'de> {
    fn take_snapshot(&self) -> Result<Vec<u8>, AccessError>;
    fn load_snapshot(&mut self, data: &'de [u8]) -> Result<(), AccessError>;
}
