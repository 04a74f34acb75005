//! Domain model (payload, process definition, items, errors, state).

pub mod errors;
pub mod href;
pub mod ids;
pub mod item;
pub mod layout;
pub mod payload;
pub mod process;
pub mod state;

pub use self::errors::{BoxError, ErrorKind, StacTaskError};
pub use self::href::{file_name, is_absolute_href, join_href, resolve_href};
pub use self::ids::ExecutionId;
pub use self::item::{Anything, Asset, Href, Item, Link, Nothing, Properties};
pub use self::layout::expand_path_template;
pub use self::payload::{Payload, PayloadType};
pub use self::process::{Process, UploadOptions};
pub use self::state::{ExecutionState, ExecutionTracker};
