pub mod conformity;
pub mod delivery;
pub mod export;
pub mod incoming;
pub mod reconciliation;

pub use conformity::resolve_conformity;
pub use delivery::DeliveryService;
pub use export::ExportKind;
