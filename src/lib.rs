pub mod classifier;
pub mod config;
pub mod error;
pub mod preprocess;
pub mod server;
pub mod service;
pub mod torch;

/// Fixed dimensions of the classifier's input and output
pub mod shape {
    /// Width and height of the square input raster
    pub const SIDE: u32 = 28;

    /// Number of pixels in a normalized sample
    pub const SAMPLE_LEN: usize = (SIDE * SIDE) as usize;

    /// Number of digit classes the classifier distinguishes
    pub const CLASSES: usize = 10;
}
