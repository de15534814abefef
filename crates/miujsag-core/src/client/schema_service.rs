use crate::engine::SearchEngine;
use crate::error::Result;
use crate::schema;

use super::Miujsag;

impl<E: SearchEngine> Miujsag<E> {
    /// Creates the article index with its mapping if it is missing.
    pub fn ensure_index(&self) -> Result<()> {
        schema::ensure_index(&self.engine, &self.index)?;
        Ok(())
    }

    /// Drops every document and the index itself, then recreates it.
    pub fn reset_index(&self) -> Result<()> {
        schema::reset_index(&self.engine, &self.index)
    }
}
