pub mod chat;
pub mod db;
pub mod insights_llm;
pub mod progression_llm;
pub mod unconfigured;

pub use db::PgDocumentStore;
pub use insights_llm::OpenAiInsightsAdapter;
pub use progression_llm::OpenAiProgressionAdapter;
pub use unconfigured::UnconfiguredFlows;
