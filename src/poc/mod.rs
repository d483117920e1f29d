pub mod definition;
pub mod loader;

pub use definition::{PocDefinition, PocDetail, Rule};
pub use loader::{discover_pocs, load_poc, parse_poc};
