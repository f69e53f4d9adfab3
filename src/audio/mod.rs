pub mod backend;
pub mod mixer;
pub mod voice;
