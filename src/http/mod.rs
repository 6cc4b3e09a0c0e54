pub mod canned;
pub mod connection;
pub mod response;

pub use connection::Client;
pub use response::{BodySegment, HttpResponse};
