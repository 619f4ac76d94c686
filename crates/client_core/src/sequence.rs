use rand::{seq::SliceRandom, Rng};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBuffer {
    values: Vec<u32>,
}

impl SequenceBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            values: (1..=len as u32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    pub fn is_sorted(&self) -> bool {
        self.values.windows(2).all(|pair| pair[0] <= pair[1])
    }

    pub fn randomize(&mut self) {
        self.randomize_with(&mut rand::rng());
    }

    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.values.shuffle(rng);
    }

    pub fn sort_ascending(&mut self) {
        if !self.is_sorted() {
            self.values.sort_unstable();
        }
    }
}
