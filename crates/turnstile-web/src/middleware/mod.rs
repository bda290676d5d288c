pub mod gate;
pub mod security_headers;
