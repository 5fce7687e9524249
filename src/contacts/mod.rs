// Public API - what other modules can use
pub use handlers::{add_contact, csrf_token, get_contacts};
pub use repository::{ContactRepository, InMemoryContactRepository};

// Internal modules
mod handlers;
pub mod repository;
pub mod types;
