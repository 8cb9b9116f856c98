pub mod draft_repo;
pub use draft_repo::DraftRepository;
pub mod procurement_repo;
pub use procurement_repo::ProcurementRepository;
