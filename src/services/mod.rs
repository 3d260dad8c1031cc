pub mod cache;
pub mod ergast;
pub mod merge;
pub mod timezone;
pub mod updater;
pub mod weather;
pub mod youtube;
