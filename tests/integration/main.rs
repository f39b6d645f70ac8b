//! Integration tests driving the pipeline through injected prices

mod config_test;
mod pipeline_test;
mod provider_test;
