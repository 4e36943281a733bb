mod handlers;
mod memory;
mod models;
mod state;

pub use handlers::{router, run_server};
pub use models::{MemoryRequest, MemoryResponse};
