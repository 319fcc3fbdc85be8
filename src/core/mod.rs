pub mod biotek;
pub mod condition_map;
pub mod etl;
pub mod growth;
pub mod imaris;
pub mod kinetics;
pub mod tecan;
pub mod viz;

pub use crate::domain::model::{Figure, NamedTable, TransformResult};
pub use crate::domain::ports::{ConfigProvider, DirEntry, Pipeline, Storage};
pub use crate::utils::error::Result;
