//! Nearest-neighbour matching of face descriptors produced by the kiosk's
//! browser-side recognition model.

pub const DESCRIPTOR_LEN: usize = 128;

/// Largest Euclidean distance still treated as the same person.
pub const MATCH_THRESHOLD: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMatch {
    pub employee_id: u64,
    pub distance: f32,
}

pub struct FaceMatcher {
    enrolled: Vec<(u64, Vec<f32>)>,
    threshold: f32,
}

/// Checks a descriptor has the expected shape and only finite values.
pub fn validate_descriptor(descriptor: &[f32]) -> Result<(), String> {
    if descriptor.len() != DESCRIPTOR_LEN {
        return Err(format!(
            "descriptor must have {DESCRIPTOR_LEN} values, got {}",
            descriptor.len()
        ));
    }
    if descriptor.iter().any(|v| !v.is_finite()) {
        return Err("descriptor contains non-finite values".to_string());
    }
    Ok(())
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

impl FaceMatcher {
    /// Builds a matcher over enrolled descriptors; malformed ones are skipped.
    pub fn new(enrolled: impl IntoIterator<Item = (u64, Vec<f32>)>, threshold: f32) -> Self {
        let enrolled = enrolled
            .into_iter()
            .filter(|(id, d)| match validate_descriptor(d) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::warn!(employee_id = id, %reason, "Skipping enrolled descriptor");
                    false
                }
            })
            .collect();
        Self { enrolled, threshold }
    }

    pub fn len(&self) -> usize {
        self.enrolled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrolled.is_empty()
    }

    pub fn best_match(&self, descriptor: &[f32]) -> Option<FaceMatch> {
        if validate_descriptor(descriptor).is_err() {
            return None;
        }

        self.enrolled
            .iter()
            .map(|(id, d)| FaceMatch {
                employee_id: *id,
                distance: euclidean_distance(d, descriptor),
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .filter(|m| m.distance <= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(fill: f32) -> Vec<f32> {
        vec![fill; DESCRIPTOR_LEN]
    }

    fn shifted(base: f32, first: f32) -> Vec<f32> {
        let mut d = descriptor(base);
        d[0] = first;
        d
    }

    #[test]
    fn test_distance() {
        assert_eq!(euclidean_distance(&[0.0, 3.0], &[4.0, 0.0]), 5.0);
    }

    #[test]
    fn test_picks_nearest_within_threshold() {
        let matcher = FaceMatcher::new(
            vec![(1, descriptor(0.0)), (2, shifted(0.0, 0.3))],
            MATCH_THRESHOLD,
        );
        let m = matcher.best_match(&shifted(0.0, 0.25)).unwrap();
        assert_eq!(m.employee_id, 2);
        assert!((m.distance - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_beyond_threshold() {
        let matcher = FaceMatcher::new(vec![(1, descriptor(0.0))], MATCH_THRESHOLD);
        assert!(matcher.best_match(&shifted(0.0, 0.5)).is_none());
        assert!(matcher.best_match(&shifted(0.0, 0.4)).is_some());
    }

    #[test]
    fn test_no_enrolled_faces() {
        let matcher = FaceMatcher::new(Vec::new(), MATCH_THRESHOLD);
        assert!(matcher.best_match(&descriptor(0.1)).is_none());
    }

    #[test]
    fn test_malformed_descriptors_skipped() {
        let mut bad = descriptor(0.0);
        bad[3] = f32::NAN;
        let matcher = FaceMatcher::new(
            vec![(1, vec![0.0; 12]), (2, bad), (3, descriptor(0.2))],
            MATCH_THRESHOLD,
        );
        assert_eq!(matcher.len(), 1);
        assert!(matcher.best_match(&[0.2; 5]).is_none());
    }

    #[test]
    fn test_validate_descriptor() {
        assert!(validate_descriptor(&descriptor(0.1)).is_ok());
        assert!(validate_descriptor(&[0.1; 3]).unwrap_err().contains("128"));
    }
}
