pub mod handlers;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod scheduler;

#[cfg(test)]
pub mod testing;
