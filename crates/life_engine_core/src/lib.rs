pub mod binding;
pub mod domain;
pub mod flows;
pub mod form;
pub mod insights;
pub mod memory;
pub mod page;
pub mod ports;
pub mod progression;
pub mod projects;
pub mod schedule;
pub mod schema;
pub mod table;

#[cfg(test)]
mod test_support;

pub use binding::{BindingRequest, BindingSnapshot, CollectionBinding};
pub use domain::{Collection, CollectionPath, Document, Fields, UserContext, UserId};
pub use memory::MemoryStore;
pub use ports::{
    AdaptiveProgressionService, CrossDomainInsightsService, DocumentStore, PortError, PortResult,
};
