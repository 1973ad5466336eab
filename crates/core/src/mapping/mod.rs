use crate::Snapshot;

/// Bucket read by visual element `element` out of `element_count`, for a
/// snapshot of `bucket_count` buckets.
///
/// Nearest-index resampling: `floor(element / element_count * bucket_count)`.
/// No interpolation, so neighbouring elements may share a bucket when there
/// are more elements than buckets.
pub fn bucket_index(element: usize, element_count: usize, bucket_count: usize) -> usize {
    if element_count == 0 || bucket_count == 0 {
        return 0;
    }
    let index = (element as f64 / element_count as f64 * bucket_count as f64).floor() as usize;
    index.min(bucket_count - 1)
}

/// Routes snapshot buckets to a fixed number of visual elements.
#[derive(Debug, Clone)]
pub struct BucketMapping {
    indices: Vec<usize>,
}

impl BucketMapping {
    pub fn new(element_count: usize, bucket_count: usize) -> Self {
        Self {
            indices: (0..element_count)
                .map(|element| bucket_index(element, element_count, bucket_count))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Amplitude fraction in [0, 1] for every element.
    pub fn fractions<'a>(&'a self, snapshot: &'a Snapshot) -> impl Iterator<Item = f32> + 'a {
        self.indices.iter().map(move |bucket| snapshot.fraction(*bucket))
    }
}
