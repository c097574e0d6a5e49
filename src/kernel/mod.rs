pub mod event;
pub mod frame;
pub mod listener;
pub mod quality;
pub mod reactor;
pub mod scheduler;
pub mod telemetry;
pub mod time;
pub mod visibility;
