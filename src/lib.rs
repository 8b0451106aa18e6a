pub mod analysis;
pub mod calendar;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod reference;
pub mod replay;
pub mod report;
pub mod session;
pub mod verify;
