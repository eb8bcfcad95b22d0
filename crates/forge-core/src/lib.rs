pub mod auto;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod history;
pub mod io;
pub mod lock;
pub mod paths;
pub mod phase;
pub mod state;

pub use error::{ForgeError, Result};
pub use phase::{Phase, PhaseSpec};
pub use state::{Activity, AutoState, PhaseStatus, ProjectState};
