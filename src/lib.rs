pub mod cli;
pub mod dashboard;
pub mod graph;
pub mod io;
pub mod model;
pub mod telemetry;
pub mod tui;
pub mod util;
pub mod view;
