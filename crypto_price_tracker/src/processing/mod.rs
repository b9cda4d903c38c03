mod moving_average;

pub use moving_average::{
    AverageThreshold, DEFAULT_THRESHOLD, DEFAULT_WINDOW_SIZE, MovingAverage,
    MovingAverageProcessor,
};
