use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display(
        "Payload ended after {} bytes, {} more required",
        available,
        required
    ))]
    MalformedPayload { required: usize, available: usize },

    #[snafu(display("Unknown raster data type tag: {}", tag))]
    UnknownRasterDataType { tag: u8 },

    #[snafu(display("Unknown time type tag: {}", tag))]
    UnknownTimeType { tag: u16 },

    #[snafu(display("Unknown result kind tag: {}", tag))]
    UnknownResultKind { tag: u8 },

    #[snafu(display("Unknown attribute column tag: {}", tag))]
    UnknownAttributeTag { tag: u8 },

    #[snafu(display("Framed string is not valid UTF-8"))]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[snafu(display(
        "Grid of {}x{} pixels does not match buffer of length {}",
        width,
        height,
        len
    ))]
    GridDimensionMismatch { width: u32, height: u32, len: usize },

    #[snafu(display("Time interval must fulfill t1 <= t2, got [{}, {}]", t1, t2))]
    InvalidTimeInterval { t1: f64, t2: f64 },

    #[snafu(display("Resolution must be at least 1x1 pixels, got {}x{}", xres, yres))]
    InvalidResolution { xres: u32, yres: u32 },

    #[snafu(display("Feature offsets must start at 0, be monotonic and end at the buffer length"))]
    InvalidFeatureOffsets,

    #[snafu(display(
        "Attribute column \"{}\" has {} values for {} features",
        column,
        values,
        features
    ))]
    AttributeLengthMismatch {
        column: String,
        values: usize,
        features: usize,
    },

    #[snafu(display("Per-feature time buffer has {} entries for {} features", entries, features))]
    TimeLengthMismatch { entries: usize, features: usize },
}
