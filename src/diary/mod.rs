pub mod audit;
pub mod clock;
pub mod config;
pub mod digest;
pub mod entry;
pub mod generate;
pub mod history;
pub mod paths;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod publish;
pub mod sanitize;
pub mod store;
pub mod warn;
