use super::{Invocation, Pipeline};
use crate::protocol::RefUpdate;
use crate::Error;

/// Accepts every push to a Subversion repository.
///
/// Subversion commits arrive as transactions rather than ref updates, so none
/// of the git checks apply. This is where Subversion specific checks go.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubversionPipeline;

impl Pipeline for SubversionPipeline {
    fn run(&self, _invocation: &Invocation<'_>) -> Result<Vec<RefUpdate>, Error> {
        tracing::debug!("no checks for subversion repositories");
        Ok(Vec::new())
    }
}
