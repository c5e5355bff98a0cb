// Concierge — personal assistant backend.
//
// Layering: `atoms` is pure data, `engine` is the runtime (backends, service
// clients, tools, orchestration), `server` is the HTTP surface. Dependencies
// point strictly downward.

pub mod atoms;
pub mod config;
pub mod engine;
pub mod server;
