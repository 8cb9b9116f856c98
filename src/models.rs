pub mod schema;
pub mod session;
pub mod widget;
pub mod procurement;
pub mod document;
