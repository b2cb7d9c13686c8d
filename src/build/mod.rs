pub mod distance;
pub mod hasher;
pub mod optimizer;
pub mod sorter;
pub mod stats;
pub mod writer;

use crate::core::config::LexiconConfig;
use crate::core::error::Result;
use crate::storage::file_lock::ArchiveLock;
use crate::storage::layout::ArchiveLayout;

/// Run the whole build pipeline over a message batch, holding the archive's
/// exclusive lock throughout: accumulate and emit the lexicon files, share
/// string suffixes, normalize ordering, build the term hash, compute fuzzy
/// neighborhoods.
pub fn build_archive(
    layout: &ArchiveLayout,
    config: LexiconConfig,
    messages: &[writer::Message],
) -> Result<()> {
    let _lock = ArchiveLock::exclusive(layout)?;

    let mut lexicon_writer = writer::LexiconWriter::new(config);
    lexicon_writer.add_batch(messages)?;
    lexicon_writer.finish(layout)?;

    optimizer::optimize_strings(layout)?;
    sorter::sort_postings(layout)?;
    hasher::build_hash(layout)?;
    distance::build_distance(layout, num_cpus::get())?;
    Ok(())
}
