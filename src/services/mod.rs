pub mod document_service;
pub mod lifecycle;
