pub mod event;
pub mod level;
pub mod present;
pub mod progression;
pub mod runner;
pub mod session;
pub mod step;
pub mod world;
