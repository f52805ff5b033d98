// Public API
pub use registry::{InMemoryUserRegistry, User, UserRegistry};

// Internal modules
mod registry;
