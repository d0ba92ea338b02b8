// Application layer: builds adapters from configuration and runs one task
// through the engine.

pub mod tasks;
