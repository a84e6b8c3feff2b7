//! Configuration.
//!
//! Settings are layered, later layers winning:
//!
//! - built-in defaults (`settings`)
//! - optional `devstack.yaml` (`parser`)
//! - values from the project's `.env` file (`env_file`)
//! - process environment variables

pub mod env_file;

mod duration;
mod parser;
mod settings;

pub use duration::*;
pub use env_file::{ensure_env_file, load_env_file, EnvFileOutcome};
pub use parser::*;
pub use settings::*;
