// When a quaternion SLERP is considered linear and not spherical
pub const LINEAR_THRESHOLD: f64 = 0.9995;

// Default bounded-channel capacity per task (the Options.buffer_size default)
pub const DEFAULT_BUFFER_SIZE: usize = 10;

// Default frame-decimation stride
pub const DEFAULT_STRIDE: usize = 1;

// Default reader progress-log cadence, in frames
pub const DEFAULT_LOG_INTERVAL: usize = 1;

// Numerical tolerance used for PeriodicBox round-trip and quaternion
// equality checks.
pub const EPSILON: f64 = 1e-5;

// Used by NeighborGrid::build: minimum number of cells along any axis.
pub const MIN_GRID_CELLS: usize = 1;
