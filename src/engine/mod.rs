// Concierge Engine — runtime layer.

pub mod chat;
pub mod enhance;
pub mod intent;
pub mod llm;
pub mod mcp;
pub mod records;
pub mod tools;
