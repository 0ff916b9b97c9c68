use crate::dataset::Record;

/// Index of a worker within one round, `0..threads`.
pub type WorkerId = usize;

/// One unit of work: a borrowed record and its position in the dataset.
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    pub index: usize,
    pub record: &'a Record,
}
