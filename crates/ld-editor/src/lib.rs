pub mod canvas;
pub mod error;
pub mod store;
pub mod workspace;

pub use canvas::{Canvas, EditorConfig};
pub use error::{StoreError, StoreResult};
pub use ld_core::History;
pub use workspace::Workspace;
