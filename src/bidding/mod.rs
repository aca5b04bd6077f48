pub mod clock;
pub mod generator;
pub mod model;
pub mod session;
