/// Density controls for stroking curve segments into points.
#[derive(Debug, Clone, Copy)]
pub struct StrokeOptions {
    /// Maximum allowed chord deviation from the true curve.
    pub chord_tolerance: f64,
    /// Maximum turning angle (radians) per chord on curved segments.
    pub angle_tolerance: f64,
    /// Maximum chord length; `0.0` disables the limit.
    pub max_edge_length: f64,
    /// Minimum number of chords per segment.
    pub min_segments: u32,
    /// Maximum number of chords per segment.
    pub max_segments: u32,
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self {
            chord_tolerance: 0.01,
            angle_tolerance: std::f64::consts::FRAC_PI_8,
            max_edge_length: 0.0,
            min_segments: 1,
            max_segments: 256,
        }
    }
}

impl StrokeOptions {
    /// Options producing chords no longer than `max_edge_length`.
    #[must_use]
    pub fn with_max_edge_length(max_edge_length: f64) -> Self {
        Self {
            max_edge_length,
            ..Self::default()
        }
    }

    /// Number of chords for a straight run of the given length.
    #[must_use]
    pub fn line_count(&self, length: f64) -> u32 {
        self.clamp_count(self.edge_length_count(length))
    }

    /// Number of chords for a circular run of the given radius and sweep.
    #[must_use]
    pub fn arc_count(&self, radius: f64, abs_sweep: f64) -> u32 {
        let by_chord = chord_subdivision_count(radius, abs_sweep, self.chord_tolerance);
        let by_angle = if self.angle_tolerance > 0.0 {
            ceil_count(abs_sweep / self.angle_tolerance)
        } else {
            1
        };
        let by_edge = self.edge_length_count(radius * abs_sweep);
        self.clamp_count(by_chord.max(by_angle).max(by_edge))
    }

    fn edge_length_count(&self, length: f64) -> u32 {
        if self.max_edge_length > 0.0 {
            ceil_count(length / self.max_edge_length)
        } else {
            1
        }
    }

    fn clamp_count(&self, n: u32) -> u32 {
        let lo = self.min_segments.max(1);
        let hi = self.max_segments.max(lo);
        n.clamp(lo, hi)
    }
}

/// Computes the number of chords needed to approximate an arc
/// within the given sagitta tolerance.
fn chord_subdivision_count(radius: f64, abs_sweep: f64, tolerance: f64) -> u32 {
    if radius < 1e-12 || abs_sweep < 1e-12 || tolerance <= 0.0 {
        return 1;
    }
    // From the sagitta formula: sagitta = r * (1 - cos(θ/2))
    let max_angle = if tolerance >= radius {
        std::f64::consts::PI
    } else {
        2.0 * (1.0 - tolerance / radius).acos()
    };
    ceil_count(abs_sweep / max_angle)
}

fn ceil_count(x: f64) -> u32 {
    if !x.is_finite() || x <= 1.0 {
        return 1;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = x.ceil().min(f64::from(u32::MAX)) as u32;
    n.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_follows_edge_length() {
        let options = StrokeOptions::with_max_edge_length(2.5);
        assert_eq!(options.line_count(10.0), 4);
        assert_eq!(options.line_count(10.1), 5);
    }

    #[test]
    fn line_count_without_limit_is_min() {
        let options = StrokeOptions::default();
        assert_eq!(options.line_count(1000.0), 1);
    }

    #[test]
    fn arc_count_large_tolerance() {
        let options = StrokeOptions {
            chord_tolerance: 10.0,
            angle_tolerance: 0.0,
            ..StrokeOptions::default()
        };
        assert_eq!(options.arc_count(1.0, std::f64::consts::PI), 1);
    }

    #[test]
    fn arc_count_small_tolerance() {
        let options = StrokeOptions {
            chord_tolerance: 0.001,
            ..StrokeOptions::default()
        };
        let n = options.arc_count(1.0, std::f64::consts::PI);
        assert!(n > 10, "expected many subdivisions, got {n}");
    }

    #[test]
    fn counts_are_clamped() {
        let options = StrokeOptions {
            max_edge_length: 0.001,
            max_segments: 16,
            ..StrokeOptions::default()
        };
        assert_eq!(options.line_count(100.0), 16);
    }
}
