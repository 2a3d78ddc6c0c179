pub mod catalog_record;
pub mod marc8;
pub mod notice;
pub mod value_objects;

pub use catalog_record::CatalogRecordError;
pub use notice::*;
pub use value_objects::*;
