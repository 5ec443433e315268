/// Estimate the cost of an item.  This is usually in bytes.
///
/// Values implementing this can be handed to [BoundedLru::insert_estimated](crate::BoundedLru::insert_estimated)
/// without the caller working out a cost themselves.
pub trait EstimateCost {
    fn estimate_cost(&self) -> u64;
}

impl EstimateCost for String {
    fn estimate_cost(&self) -> u64 {
        self.len() as u64
    }
}

impl EstimateCost for Vec<u8> {
    fn estimate_cost(&self) -> u64 {
        self.len() as u64
    }
}

impl EstimateCost for Box<[u8]> {
    fn estimate_cost(&self) -> u64 {
        self.len() as u64
    }
}
