// Adapters layer: concrete implementations for external systems (storage, http clients).

pub mod crm;
pub mod gemini;
pub mod storage;
