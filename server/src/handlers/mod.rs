pub mod corpus_handlers;
pub mod job_handlers;
