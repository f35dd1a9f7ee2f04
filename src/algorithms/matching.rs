use crate::algorithms::orb::Feature;
use rayon::prelude::*;

/// A mutual-nearest-neighbour correspondence between two feature sets.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMatch {
    pub reference_idx: usize,
    pub secondary_idx: usize,
    pub distance: u32,
}

pub fn hamming_distance(desc1: &[u8; 32], desc2: &[u8; 32]) -> u32 {
    desc1
        .iter()
        .zip(desc2.iter())
        .map(|(a, b)| (a ^ b).count_ones())
        .sum()
}

/// Brute-force Hamming matching with cross-check: a pair is kept only when
/// each descriptor is the other's nearest neighbour. Ties resolve to the
/// lowest candidate index in both directions, so the result is deterministic.
pub fn match_descriptors(reference: &[Feature], secondary: &[Feature]) -> Vec<DescriptorMatch> {
    if reference.is_empty() || secondary.is_empty() {
        return Vec::new();
    }

    let nearest_in_secondary: Vec<(usize, u32)> = reference
        .par_iter()
        .map(|feature| nearest_neighbor(&feature.descriptor, secondary))
        .collect();

    let nearest_in_reference: Vec<(usize, u32)> = secondary
        .par_iter()
        .map(|feature| nearest_neighbor(&feature.descriptor, reference))
        .collect();

    nearest_in_secondary
        .iter()
        .enumerate()
        .filter_map(|(reference_idx, &(secondary_idx, distance))| {
            if nearest_in_reference[secondary_idx].0 == reference_idx {
                Some(DescriptorMatch {
                    reference_idx,
                    secondary_idx,
                    distance,
                })
            } else {
                None
            }
        })
        .collect()
}

fn nearest_neighbor(descriptor: &[u8; 32], candidates: &[Feature]) -> (usize, u32) {
    let mut best_idx = 0;
    let mut best_distance = u32::MAX;

    for (idx, candidate) in candidates.iter().enumerate() {
        let distance = hamming_distance(descriptor, &candidate.descriptor);
        if distance < best_distance {
            best_distance = distance;
            best_idx = idx;
        }
    }

    (best_idx, best_distance)
}

/// Keep at most `cap` lowest-distance matches. A small, low-distance subset
/// limits the outlier fraction the downstream estimator has to absorb.
pub fn select_good_matches(mut matches: Vec<DescriptorMatch>, cap: usize) -> Vec<DescriptorMatch> {
    matches.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then(a.reference_idx.cmp(&b.reference_idx))
    });
    matches.truncate(cap);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::orb::Keypoint;

    fn feature_with_descriptor(descriptor: [u8; 32]) -> Feature {
        Feature {
            keypoint: Keypoint {
                x: 0.0,
                y: 0.0,
                response: 1.0,
                angle: 0.0,
                octave: 0,
                scale: 1.0,
            },
            descriptor,
        }
    }

    fn descriptor_with_bits(bytes: &[(usize, u8)]) -> [u8; 32] {
        let mut descriptor = [0u8; 32];
        for &(idx, value) in bytes {
            descriptor[idx] = value;
        }
        descriptor
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let a = descriptor_with_bits(&[(0, 0b1111_0000)]);
        let b = descriptor_with_bits(&[(0, 0b0000_1111)]);
        assert_eq!(hamming_distance(&a, &b), 8);
        assert_eq!(hamming_distance(&a, &a), 0);
    }

    #[test]
    fn cross_check_keeps_mutual_pairs() {
        let reference = vec![
            feature_with_descriptor(descriptor_with_bits(&[(0, 0xFF)])),
            feature_with_descriptor(descriptor_with_bits(&[(1, 0xFF)])),
        ];
        let secondary = vec![
            feature_with_descriptor(descriptor_with_bits(&[(1, 0xFF)])),
            feature_with_descriptor(descriptor_with_bits(&[(0, 0xFF)])),
        ];

        let matches = match_descriptors(&reference, &secondary);
        assert_eq!(matches.len(), 2);
        assert!(matches
            .iter()
            .any(|m| m.reference_idx == 0 && m.secondary_idx == 1 && m.distance == 0));
        assert!(matches
            .iter()
            .any(|m| m.reference_idx == 1 && m.secondary_idx == 0 && m.distance == 0));
    }

    #[test]
    fn cross_check_drops_one_sided_pairs() {
        // Both reference descriptors are closest to secondary 0, but secondary 0
        // can only point back at one of them.
        let reference = vec![
            feature_with_descriptor(descriptor_with_bits(&[(0, 0b0000_0001)])),
            feature_with_descriptor(descriptor_with_bits(&[(0, 0b0000_0011)])),
        ];
        let secondary = vec![feature_with_descriptor(descriptor_with_bits(&[]))];

        let matches = match_descriptors(&reference, &secondary);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reference_idx, 0);
    }

    #[test]
    fn empty_inputs_yield_no_matches() {
        let features = vec![feature_with_descriptor([0u8; 32])];
        assert!(match_descriptors(&[], &features).is_empty());
        assert!(match_descriptors(&features, &[]).is_empty());
    }

    #[test]
    fn good_matches_are_lowest_distance_first() {
        let matches = vec![
            DescriptorMatch {
                reference_idx: 0,
                secondary_idx: 0,
                distance: 40,
            },
            DescriptorMatch {
                reference_idx: 1,
                secondary_idx: 1,
                distance: 5,
            },
            DescriptorMatch {
                reference_idx: 2,
                secondary_idx: 2,
                distance: 20,
            },
        ];

        let good = select_good_matches(matches, 2);
        assert_eq!(good.len(), 2);
        assert_eq!(good[0].distance, 5);
        assert_eq!(good[1].distance, 20);
    }
}
