pub mod composition;
pub mod extractor;
pub mod heatmap;
pub mod image;
pub mod model;
pub mod store;
