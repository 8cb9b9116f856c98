pub mod schema;
pub mod form;
pub mod drafts;
pub mod procurements;
pub mod documents;
