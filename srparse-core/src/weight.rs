//! Sparse perceptron weights
//!
//! A [`Weight`] stores the per-transition weights of one feature as two
//! parallel arrays. Most features fire with only a handful of
//! transitions, so the arrays stay short and live inline.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Transition-index to value map for one feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weight {
    indices: SmallVec<[u32; 4]>,
    values: SmallVec<[f32; 4]>,
}

impl Weight {
    /// Creates an empty weight
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, zeros included
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value for a transition index, zero if absent
    pub fn get(&self, index: usize) -> f32 {
        self.position(index).map_or(0.0, |position| self.values[position])
    }

    /// Adds every stored value into `scores`
    pub fn score(&self, scores: &mut [f32]) {
        for (&index, &value) in self.indices.iter().zip(&self.values) {
            if let Some(score) = scores.get_mut(index as usize) {
                *score += value;
            }
        }
    }

    /// Adds `increment` to the entry for `index`, allocating it if needed
    pub fn update_weight(&mut self, index: usize, increment: f32) {
        match self.position(index) {
            Some(position) => self.values[position] += increment,
            None => {
                self.indices.push(index as u32);
                self.values.push(increment);
            }
        }
        debug_assert!(
            self.values.iter().all(|value| value.is_finite()),
            "non-finite weight after update"
        );
    }

    /// Adds `other * scale` entry by entry
    pub fn add_scaled(&mut self, other: &Weight, scale: f32) {
        for (&index, &value) in other.indices.iter().zip(&other.values) {
            self.update_weight(index as usize, value * scale);
        }
    }

    /// Drops zero entries
    pub fn condense(&mut self) {
        let mut keep = 0;
        for position in 0..self.indices.len() {
            if self.values[position] != 0.0 {
                self.indices[keep] = self.indices[position];
                self.values[keep] = self.values[position];
                keep += 1;
            }
        }
        self.indices.truncate(keep);
        self.values.truncate(keep);
    }

    /// Shrinks every value by the factor `1 - reg`
    pub fn l2_reg(&mut self, reg: f32) {
        for value in &mut self.values {
            *value *= 1.0 - reg;
        }
    }

    /// Largest absolute value
    pub fn max_abs(&self) -> f32 {
        self.values.iter().fold(0.0, |max, value| max.max(value.abs()))
    }

    /// `(transition index, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&index, &value)| (index as usize, value))
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.indices.iter().position(|&stored| stored as usize == index)
    }
}

/// Feature name to [`Weight`]
#[derive(Debug, Clone, Default)]
pub struct WeightMap {
    weights: FxHashMap<String, Weight>,
}

impl WeightMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of a feature
    pub fn get(&self, feature: &str) -> Option<&Weight> {
        self.weights.get(feature)
    }

    /// Weight of a feature, created empty on first use
    pub fn entry(&mut self, feature: &str) -> &mut Weight {
        self.weights.entry(feature.to_string()).or_default()
    }

    /// Adds `increment` to `feature`'s entry for transition `index`
    pub fn update(&mut self, feature: &str, index: usize, increment: f32) {
        match self.weights.get_mut(feature) {
            Some(weight) => weight.update_weight(index, increment),
            None => {
                let mut weight = Weight::new();
                weight.update_weight(index, increment);
                self.weights.insert(feature.to_string(), weight);
            }
        }
    }

    /// Adds the weights of every active feature into `scores`
    pub fn score<S: AsRef<str>>(&self, features: &[S], scores: &mut [f32]) {
        for feature in features {
            if let Some(weight) = self.weights.get(feature.as_ref()) {
                weight.score(scores);
            }
        }
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// True if no feature has a weight
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// True if `feature` has a weight
    pub fn contains(&self, feature: &str) -> bool {
        self.weights.contains_key(feature)
    }

    /// Total number of stored entries across features
    pub fn num_weights(&self) -> usize {
        self.weights.values().map(Weight::len).sum()
    }

    /// Largest absolute value across features
    pub fn max_abs(&self) -> f32 {
        self.weights
            .values()
            .fold(0.0, |max, weight| max.max(weight.max_abs()))
    }

    /// Feature names in arbitrary order
    pub fn features(&self) -> impl Iterator<Item = &String> {
        self.weights.keys()
    }

    /// `(feature, weight)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Weight)> {
        self.weights.iter()
    }

    /// Drops zero entries and features left without entries
    pub fn condense(&mut self) {
        self.weights.retain(|_, weight| {
            weight.condense();
            !weight.is_empty()
        });
    }

    /// Keeps only the listed features
    pub fn retain_features(&mut self, keep: &FxHashSet<String>) {
        self.weights.retain(|feature, _| keep.contains(feature));
    }

    /// Applies [`Weight::l2_reg`] to every feature
    pub fn l2_reg(&mut self, reg: f32) {
        for weight in self.weights.values_mut() {
            weight.l2_reg(reg);
        }
    }

    /// Adds `other * scale` feature by feature
    pub fn add_scaled(&mut self, other: &WeightMap, scale: f32) {
        for (feature, weight) in &other.weights {
            self.entry(feature).add_scaled(weight, scale);
        }
    }

    /// Arithmetic mean over the union of features
    pub fn average(maps: &[&WeightMap]) -> WeightMap {
        let mut averaged = WeightMap::new();
        if maps.is_empty() {
            return averaged;
        }
        let scale = 1.0 / maps.len() as f32;
        for map in maps {
            averaged.add_scaled(map, scale);
        }
        averaged
    }
}
