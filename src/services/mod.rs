pub mod charts;
pub mod scheduler;
pub mod stats;
pub mod timewindow;
pub mod timezones;
