use std::time::Duration;

// Locked rent above this is highlighted in the terminal UI
pub const HIGH_RENT_THRESHOLD_SOL: f64 = 1.0;

// Terminal UI
pub const TICK_RATE: Duration = Duration::from_millis(100);
pub const MAX_LOG_LINES: usize = 50;
pub const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
