pub mod captions;
pub mod extract;
