// backfill-engine: configuration, git side effects, the GitLab events client and the pipeline.

pub mod config;
pub mod git;
pub mod gitlab;
pub mod pipeline;
