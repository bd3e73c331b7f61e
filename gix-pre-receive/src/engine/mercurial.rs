use super::{Invocation, Pipeline};
use crate::protocol::RefUpdate;
use crate::Error;

/// Accepts every push to a Mercurial repository.
///
/// This is where checks of Mercurial bookmark and branch changes go.
#[derive(Debug, Clone, Copy, Default)]
pub struct MercurialPipeline;

impl Pipeline for MercurialPipeline {
    fn run(&self, _invocation: &Invocation<'_>) -> Result<Vec<RefUpdate>, Error> {
        tracing::debug!("no checks for mercurial repositories");
        Ok(Vec::new())
    }
}
