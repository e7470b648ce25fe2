pub mod progress;
pub mod project;
pub mod record;
pub mod seed;
pub mod statement;
