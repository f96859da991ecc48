pub mod animation;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod reachability;
pub mod session;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{Error, Result};
pub use layout::{DiagramLayout, LayoutCache, compute_layout};
pub use parser::parse_definition;
pub use session::DiagramSession;
