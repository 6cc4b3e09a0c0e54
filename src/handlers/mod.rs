pub mod blog_handler;
pub mod static_handler;

pub use blog_handler::handle_blog;
pub use static_handler::handle_static;
