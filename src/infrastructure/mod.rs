pub mod logging;
pub mod manager;
pub mod transport;
