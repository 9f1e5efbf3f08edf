pub mod filters;
pub mod histogram;
pub mod selection;
pub mod text;
pub mod transform;
