mod coordinate;
mod query_rectangle;
mod spatio_temporal_reference;
mod time;

pub use coordinate::Coordinate2D;
pub use query_rectangle::{CrsId, QueryRectangle};
pub use spatio_temporal_reference::{SpatioTemporalReference, TimeType};
pub use time::{TemporalBound, TimeInterval};
