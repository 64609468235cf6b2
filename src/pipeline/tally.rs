use crate::pipeline::gate::{ClassifiedDetection, LeafClass};

/// Per-call counts of gated detections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub healthy: usize,
    pub diseased: usize,
    pub uncertain: usize,
}

impl Tally {
    /// Fold gated detections into counts.
    pub fn from_detections(detections: &[ClassifiedDetection]) -> Self {
        detections.iter().map(|d| d.class).collect()
    }

    pub fn record(&mut self, class: LeafClass) {
        match class {
            LeafClass::Healthy => self.healthy += 1,
            LeafClass::Diseased => self.diseased += 1,
            LeafClass::Uncertain => self.uncertain += 1,
        }
    }

    /// Confidently classified leaves; the incidence denominator.
    pub fn counted(&self) -> usize {
        self.healthy + self.diseased
    }

    pub fn total_all(&self) -> usize {
        self.counted() + self.uncertain
    }

    /// Health ratio and disease incidence, or `None` when nothing was counted.
    pub fn metrics(&self) -> Option<Metrics> {
        let counted = self.counted();
        if counted == 0 {
            return None;
        }
        let counted = counted as f64;
        Some(Metrics {
            health_ratio: self.healthy as f64 / counted,
            disease_incidence: self.diseased as f64 / counted,
        })
    }
}

impl FromIterator<LeafClass> for Tally {
    fn from_iter<I: IntoIterator<Item = LeafClass>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for class in iter {
            tally.record(class);
        }
        tally
    }
}

/// Incidence metrics over counted leaves. The two fields sum to one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub health_ratio: f64,
    pub disease_incidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_label_once() {
        let tally: Tally = [
            LeafClass::Diseased,
            LeafClass::Healthy,
            LeafClass::Uncertain,
            LeafClass::Diseased,
        ]
        .into_iter()
        .collect();

        assert_eq!(tally.healthy, 1);
        assert_eq!(tally.diseased, 2);
        assert_eq!(tally.uncertain, 1);
        assert_eq!(tally.counted(), 3);
        assert_eq!(tally.total_all(), 4);
    }

    #[test]
    fn order_does_not_matter() {
        let forward: Tally = [LeafClass::Healthy, LeafClass::Uncertain, LeafClass::Diseased]
            .into_iter()
            .collect();
        let backward: Tally = [LeafClass::Diseased, LeafClass::Uncertain, LeafClass::Healthy]
            .into_iter()
            .collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn metrics_undefined_without_counted_leaves() {
        let only_uncertain = Tally {
            healthy: 0,
            diseased: 0,
            uncertain: 5,
        };
        assert!(only_uncertain.metrics().is_none());
        assert!(Tally::default().metrics().is_none());
    }

    #[test]
    fn metrics_are_complementary() {
        for healthy in 0..7 {
            for diseased in 0..7 {
                let tally = Tally {
                    healthy,
                    diseased,
                    uncertain: 2,
                };
                match tally.metrics() {
                    Some(m) => {
                        assert!((m.health_ratio + m.disease_incidence - 1.0).abs() < 1e-12);
                        assert!((0.0..=1.0).contains(&m.disease_incidence));
                    }
                    None => assert_eq!(tally.counted(), 0),
                }
            }
        }
    }
}
