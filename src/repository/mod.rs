// Repository 抽象层
pub mod purchase_repository;

pub use purchase_repository::{
    InMemoryPurchaseRepository, PgPurchaseRepository, PurchaseRepository,
};
