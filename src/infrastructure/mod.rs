pub mod offload;
pub mod rendering;
pub mod services;
