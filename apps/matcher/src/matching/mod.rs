// CV-to-job matching: structured parsing, rubric scoring, fusion ranking and the
// batch orchestrator that ties them together. Model calls go through llm_client
// and embeddings; nothing here talks HTTP to the model server directly.

pub mod cv_parser;
pub mod feedback;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod ranker;
pub mod scorer;
