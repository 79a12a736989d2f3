pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from_env, load_from_file, load_from_str};
pub use schema::Config;
pub use validation::{validate_config, USER_PARTICIPANT};
