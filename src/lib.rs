pub mod card;
pub mod logging;
pub mod server;
pub mod settings;

pub use card::{CardFonts, CardRenderer, wrap};
pub use server::{MemoryRequest, MemoryResponse, router, run_server};
