pub mod catalog;
pub mod conformity;
pub mod delivery;
pub mod incoming;
pub mod order;
pub mod reconciliation;
mod serde_helpers;
pub mod user;

pub use catalog::{
    Department, DepartmentInput, NewStockItem, StockItem, StockItemInput, Supplier, SupplierInput,
};
pub use conformity::{ConformityStatus, ConformityStatusInput};
pub use delivery::{ArticleInput, Delivery, DeliveryArticle, DeliveryFilter, DeliveryInput, NewArticle, NewDelivery};
pub use incoming::{IncomingOrder, LineProgress};
pub use order::{NewOrder, Order, OrderInput, OrderLine, OrderLineInput, OrderUpdate};
pub use reconciliation::{CapacityViolation, ReconciliationRecord, ReconciliationReport};
pub use user::{User, UserInput};
