pub mod python;
pub mod types;

use anyhow::Result;

pub use types::{ConvertBatch, ConvertItem, ConvertOut, DocDiag, ItemResult, ParseOptions};

/// The external document converter.
///
/// `convert` should process every item it can and report the rest as failed
/// results. An `Err` means the call as a whole went wrong (the runner crashed,
/// timed out, or produced unreadable output).
pub trait Converter {
    fn doctor(&self) -> Result<DocDiag>;
    fn convert(&self, batch: &ConvertBatch) -> Result<ConvertOut>;
}

impl<C: Converter + ?Sized> Converter for &C {
    fn doctor(&self) -> Result<DocDiag> {
        (**self).doctor()
    }

    fn convert(&self, batch: &ConvertBatch) -> Result<ConvertOut> {
        (**self).convert(batch)
    }
}
