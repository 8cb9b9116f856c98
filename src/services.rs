pub mod reconcile;
pub mod visibility;
pub mod lots;
pub mod renderer;
pub mod validation;
pub mod form_service;

pub mod draft_service;
pub mod procurement_service;

pub mod document_layout;
pub mod word_export;
pub mod document_service;
