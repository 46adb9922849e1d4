//! Supporting submodules for the field registry (`src/field.rs`): date
//! normalization, select-option resolution, and file-cell wire shapes.

pub mod date;
pub mod file;
pub mod select;

pub use date::{DateAttrs, DateFormat, TimeFormat};
pub use file::UserFile;
pub use select::SelectOption;
